//! Doubly-linked list addressable by position and by node reference.
//!
//! Nodes live in a generation-checked arena, so a [`NodeRef`] stays valid
//! across unrelated insertions and removals and a reference to a removed node
//! is never mistaken for a node allocated later in the same slot.
//!
//! # Index Policy
//! ```text
//! insert_at_index   index <= 0      → head
//!                   index >= len    → tail
//!                   empty list      → single node, any index
//! remove/get        index <= 0      → first node
//!                   index >= len-1  → last node
//!                   empty list      → nothing
//! ```
//!
//! # Reference Policy
//! A `None` reference means "the last node" for element reads, previous-node
//! lookup and removal, and "past the end" for insertion. A reference that
//! does not belong to the list is rejected without modifying it.

use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;

use super::ops::{Disposal, ElementOps, FnOps, Insertion};

/// Stable handle to a node of an [`OrderedList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    slot: usize,
    generation: u64,
}

struct Node<T> {
    element: T,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Slot<T> {
    generation: u64,
    node: Option<Node<T>>,
}

/// Generic ordered sequence bound to a set of [`ElementOps`].
pub struct OrderedList<T, O> {
    slots: Vec<Slot<T>>,
    vacant: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    ops: O,
}

impl<T> OrderedList<T, FnOps<T>> {
    /// Create an empty list from copy, free and compare callbacks.
    pub fn from_fns(
        copy: impl Fn(&T) -> T + 'static,
        free: impl Fn(T) + 'static,
        compare: impl Fn(&T, &T) -> Ordering + 'static,
    ) -> Self {
        Self::new(FnOps::new(copy, free, compare))
    }
}

impl<T, O: ElementOps<T>> OrderedList<T, O> {
    /// Create an empty list bound to `ops`.
    pub fn new(ops: O) -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            head: None,
            tail: None,
            len: 0,
            ops,
        }
    }

    /// Release every node and the list itself, leaving `None` in the slot.
    ///
    /// With [`Disposal::Free`] every element goes through
    /// [`ElementOps::free`]; with [`Disposal::Keep`] the elements are returned
    /// in list order.
    ///
    /// # Panics
    ///
    /// Panics if the slot holds no list. Freeing twice is a caller bug.
    pub fn free(list: &mut Option<Self>, disposal: Disposal) -> Vec<T> {
        let Some(mut list) = list.take() else {
            panic!("OrderedList::free called on a list that was already freed");
        };

        let mut kept = Vec::with_capacity(list.len);
        while !list.is_empty() {
            if let Some(element) = list.remove_at_index(0, disposal) {
                kept.push(element);
            }
        }
        kept
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list holds no elements.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Insert before the node currently at `index`.
    pub fn insert_at_index(&mut self, insertion: Insertion<'_, T>, index: isize) -> &mut Self {
        let element = self.materialize(insertion);
        let before = if self.is_empty() || index <= 0 {
            self.head
        } else if (index as usize) < self.len {
            self.slot_at_position(index as usize)
        } else {
            None
        };

        let slot = self.allocate(element);
        self.link_before(slot, before);
        self
    }

    /// Remove the node at the clamped `index`.
    ///
    /// Returns the element when `disposal` is [`Disposal::Keep`]. An empty
    /// list is left untouched.
    pub fn remove_at_index(&mut self, index: isize, disposal: Disposal) -> Option<T> {
        let position = self.clamp(index)?;
        let slot = self.slot_at_position(position)?;
        let element = self.unlink(slot)?;
        self.dispose(element, disposal)
    }

    /// Reference to the node at the clamped `index`.
    pub fn reference_at_index(&self, index: isize) -> Option<NodeRef> {
        let position = self.clamp(index)?;
        self.slot_at_position(position).map(|slot| self.reference(slot))
    }

    /// Element at the clamped `index`. No copy is made.
    pub fn element_at_index(&self, index: isize) -> Option<&T> {
        let position = self.clamp(index)?;
        let slot = self.slot_at_position(position)?;
        self.node(slot).map(|node| &node.element)
    }

    /// Position of the first element comparing equal to `element`.
    pub fn index_of_element(&self, element: &T) -> Option<usize> {
        self.iter()
            .position(|existing| self.ops.compare(existing, element) == Ordering::Equal)
    }

    /// Reference to the first node.
    pub fn first_reference(&self) -> Option<NodeRef> {
        self.head.map(|slot| self.reference(slot))
    }

    /// Reference to the last node.
    pub fn last_reference(&self) -> Option<NodeRef> {
        self.tail.map(|slot| self.reference(slot))
    }

    /// Reference to the node after `reference`. `None` in, `None` out.
    pub fn next_reference(&self, reference: Option<NodeRef>) -> Option<NodeRef> {
        let slot = self.resolve(reference?)?;
        let next = self.node(slot)?.next?;
        Some(self.reference(next))
    }

    /// Reference to the node before `reference`, or the last node when
    /// `reference` is `None`.
    pub fn previous_reference(&self, reference: Option<NodeRef>) -> Option<NodeRef> {
        match reference {
            None => self.last_reference(),
            Some(reference) => {
                let slot = self.resolve(reference)?;
                let prev = self.node(slot)?.prev?;
                Some(self.reference(prev))
            }
        }
    }

    /// Element held by `reference`, or by the last node when `None`.
    pub fn element_at_reference(&self, reference: Option<NodeRef>) -> Option<&T> {
        let slot = match reference {
            None => self.tail?,
            Some(reference) => self.resolve(reference)?,
        };
        self.node(slot).map(|node| &node.element)
    }

    /// Mutable access to the element held by `reference`, or by the last node
    /// when `None`.
    pub fn element_at_reference_mut(&mut self, reference: Option<NodeRef>) -> Option<&mut T> {
        let slot = match reference {
            None => self.tail?,
            Some(reference) => self.resolve(reference)?,
        };
        self.node_mut(slot).map(|node| &mut node.element)
    }

    /// Reference to the first node whose element compares equal to `element`.
    pub fn reference_of_element(&self, element: &T) -> Option<NodeRef> {
        self.references().find(|reference| {
            self.element_at_reference(Some(*reference))
                .is_some_and(|existing| self.ops.compare(existing, element) == Ordering::Equal)
        })
    }

    /// Position of `reference`, or of the last node when `None`.
    pub fn index_of_reference(&self, reference: Option<NodeRef>) -> Option<usize> {
        match reference {
            None => self.len.checked_sub(1),
            Some(reference) => {
                let target = self.resolve(reference)?;
                self.slots_in_order().position(|slot| slot == target)
            }
        }
    }

    /// Whether `reference` points at a node of this list.
    pub fn contains_reference(&self, reference: NodeRef) -> bool {
        self.resolve(reference).is_some()
    }

    /// Insert before the node identified by `reference`, or append when
    /// `reference` is `None`.
    ///
    /// An unknown reference leaves the list untouched and hands the insertion
    /// back.
    pub fn insert_at_reference<'a>(
        &mut self,
        insertion: Insertion<'a, T>,
        reference: Option<NodeRef>,
    ) -> Result<&mut Self, Insertion<'a, T>> {
        let before = match reference {
            None => None,
            Some(reference) => match self.resolve(reference) {
                Some(slot) => Some(slot),
                None => return Err(insertion),
            },
        };

        let element = self.materialize(insertion);
        let slot = self.allocate(element);
        self.link_before(slot, before);
        Ok(self)
    }

    /// Insert before the first element that `element` orders strictly below,
    /// or at the tail. Equal elements keep their relative insertion order.
    pub fn insert_sorted(&mut self, insertion: Insertion<'_, T>) -> &mut Self {
        let element = self.materialize(insertion);
        let before = self.slots_in_order().find(|&slot| {
            self.node(slot)
                .is_some_and(|node| self.ops.compare(&element, &node.element) == Ordering::Less)
        });

        let slot = self.allocate(element);
        self.link_before(slot, before);
        self
    }

    /// Remove the node identified by `reference`, or the last node when
    /// `None`. An unknown reference leaves the list untouched.
    pub fn remove_at_reference(
        &mut self,
        reference: Option<NodeRef>,
        disposal: Disposal,
    ) -> Option<T> {
        let slot = match reference {
            None => self.tail?,
            Some(reference) => self.resolve(reference)?,
        };
        let element = self.unlink(slot)?;
        self.dispose(element, disposal)
    }

    /// Remove the first node whose element compares equal to `element`.
    pub fn remove_element(&mut self, element: &T, disposal: Disposal) -> Option<T> {
        let reference = self.reference_of_element(element)?;
        self.remove_at_reference(Some(reference), disposal)
    }

    /// Elements from head to tail.
    pub fn iter(&self) -> Iter<'_, T, O> {
        Iter {
            list: self,
            front: self.head,
            back: self.tail,
            remaining: self.len,
        }
    }

    /// Node references from head to tail.
    pub fn references(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.slots_in_order().map(|slot| self.reference(slot))
    }

    fn slots_in_order(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.head, move |&slot| self.node(slot).and_then(|node| node.next))
    }

    fn clamp(&self, index: isize) -> Option<usize> {
        let last = self.len.checked_sub(1)?;
        if index <= 0 {
            Some(0)
        } else {
            Some((index as usize).min(last))
        }
    }

    fn slot_at_position(&self, position: usize) -> Option<usize> {
        if position >= self.len {
            return None;
        }

        if position <= self.len / 2 {
            self.slots_in_order().nth(position)
        } else {
            let steps = self.len - 1 - position;
            std::iter::successors(self.tail, |&slot| self.node(slot).and_then(|node| node.prev))
                .nth(steps)
        }
    }

    fn node(&self, slot: usize) -> Option<&Node<T>> {
        self.slots.get(slot).and_then(|entry| entry.node.as_ref())
    }

    fn node_mut(&mut self, slot: usize) -> Option<&mut Node<T>> {
        self.slots.get_mut(slot).and_then(|entry| entry.node.as_mut())
    }

    fn resolve(&self, reference: NodeRef) -> Option<usize> {
        let entry = self.slots.get(reference.slot)?;
        (entry.generation == reference.generation && entry.node.is_some()).then_some(reference.slot)
    }

    fn reference(&self, slot: usize) -> NodeRef {
        NodeRef {
            slot,
            generation: self.slots[slot].generation,
        }
    }

    fn materialize(&self, insertion: Insertion<'_, T>) -> T {
        match insertion {
            Insertion::Owned(element) => element,
            Insertion::Copied(element) => self.ops.copy(element),
        }
    }

    fn dispose(&self, element: T, disposal: Disposal) -> Option<T> {
        match disposal {
            Disposal::Free => {
                self.ops.free(element);
                None
            }
            Disposal::Keep => Some(element),
        }
    }

    fn allocate(&mut self, element: T) -> usize {
        let node = Node {
            element,
            prev: None,
            next: None,
        };

        match self.vacant.pop() {
            Some(slot) => {
                self.slots[slot].node = Some(node);
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    fn link_before(&mut self, slot: usize, before: Option<usize>) {
        let prev = match before {
            None => self.tail,
            Some(at) => self.node(at).and_then(|node| node.prev),
        };

        if let Some(node) = self.node_mut(slot) {
            node.prev = prev;
            node.next = before;
        }

        match before {
            Some(at) => {
                if let Some(node) = self.node_mut(at) {
                    node.prev = Some(slot);
                }
            }
            None => self.tail = Some(slot),
        }

        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }

        self.len += 1;
    }

    fn unlink(&mut self, slot: usize) -> Option<T> {
        let entry = self.slots.get_mut(slot)?;
        let node = entry.node.take()?;
        entry.generation += 1;
        self.vacant.push(slot);

        match node.prev {
            Some(p) => {
                if let Some(prev) = self.node_mut(p) {
                    prev.next = node.next;
                }
            }
            None => self.head = node.next,
        }

        match node.next {
            Some(n) => {
                if let Some(next) = self.node_mut(n) {
                    next.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }

        self.len -= 1;
        Some(node.element)
    }
}

impl<T: fmt::Debug, O: ElementOps<T>> fmt::Debug for OrderedList<T, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over list elements.
pub struct Iter<'a, T, O> {
    list: &'a OrderedList<T, O>,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<'a, T, O: ElementOps<T>> Iterator for Iter<'a, T, O> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.list.node(self.front?)?;
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, O: ElementOps<T>> DoubleEndedIterator for Iter<'_, T, O> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.list.node(self.back?)?;
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.element)
    }
}

impl<T, O: ElementOps<T>> ExactSizeIterator for Iter<'_, T, O> {}

impl<T, O: ElementOps<T>> FusedIterator for Iter<'_, T, O> {}

impl<'a, T, O: ElementOps<T>> IntoIterator for &'a OrderedList<T, O> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, O>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
