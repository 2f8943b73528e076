//! Deadline queue built on [`OrderedList`].
//!
//! New entries are appended at the tail, not sorted in. Only the head entry
//! drives the poll timeout, while eviction walks the whole queue so an entry
//! that expired behind a later head is still found on the next wake.

use std::cmp::Ordering;
use std::fmt;
use std::time::{Duration, Instant};

use crate::collections::{Disposal, ElementOps, Insertion, NodeRef, OrderedList};

/// A connection handle paired with the instant it goes idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEntry<H> {
    /// Connection this deadline belongs to.
    pub handle: H,
    /// Absolute idle deadline.
    pub deadline: Instant,
}

/// Orders timer entries by deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadlineOps;

impl<H: Copy> ElementOps<TimerEntry<H>> for DeadlineOps {
    fn copy(&self, element: &TimerEntry<H>) -> TimerEntry<H> {
        *element
    }

    fn compare(&self, lhs: &TimerEntry<H>, rhs: &TimerEntry<H>) -> Ordering {
        lhs.deadline.cmp(&rhs.deadline)
    }
}

/// Idle deadlines for live connections, at most one entry per handle.
pub struct TimerQueue<H> {
    entries: OrderedList<TimerEntry<H>, DeadlineOps>,
}

impl<H> TimerQueue<H>
where
    H: Copy + Eq + fmt::Debug,
{
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            entries: OrderedList::new(DeadlineOps),
        }
    }

    /// Append a deadline for `handle` at the tail.
    ///
    /// If the handle already has an entry, that entry is updated in place and
    /// `false` is returned.
    pub fn schedule(&mut self, handle: H, deadline: Instant) -> bool {
        if self.refresh(handle, deadline) {
            tracing::warn!(?handle, "Handle already scheduled, deadline updated in place");
            return false;
        }

        let tail = self.entries.len() as isize + 1;
        self.entries
            .insert_at_index(Insertion::Owned(TimerEntry { handle, deadline }), tail);
        true
    }

    /// Move the deadline of `handle` without reordering the queue.
    ///
    /// Returns `false` when the handle has no entry.
    pub fn refresh(&mut self, handle: H, deadline: Instant) -> bool {
        let Some(reference) = self.find(handle) else {
            return false;
        };

        match self.entries.element_at_reference_mut(Some(reference)) {
            Some(entry) => {
                entry.deadline = deadline;
                true
            }
            None => false,
        }
    }

    /// Drop the entry for `handle`, returning its deadline.
    pub fn cancel(&mut self, handle: H) -> Option<Instant> {
        let reference = self.find(handle)?;
        self.entries
            .remove_at_reference(Some(reference), Disposal::Keep)
            .map(|entry| entry.deadline)
    }

    /// Deadline held by the head entry.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.element_at_index(0).map(|entry| entry.deadline)
    }

    /// Time from `now` until the head deadline, never negative.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Remove every entry whose deadline is strictly before `now`.
    ///
    /// The whole queue is scanned; handles come back in queue order.
    pub fn evict_expired(&mut self, now: Instant) -> Vec<H> {
        let mut expired = Vec::new();
        let mut cursor = self.entries.first_reference();

        while let Some(reference) = cursor {
            cursor = self.entries.next_reference(Some(reference));

            let due = self
                .entries
                .element_at_reference(Some(reference))
                .is_some_and(|entry| entry.deadline < now);
            if !due {
                continue;
            }

            if let Some(entry) = self
                .entries
                .remove_at_reference(Some(reference), Disposal::Keep)
            {
                tracing::debug!(handle = ?entry.handle, "Deadline expired");
                expired.push(entry.handle);
            }

            if self.entries.is_empty() {
                break;
            }
        }

        expired
    }

    /// Deadline currently recorded for `handle`.
    pub fn deadline_of(&self, handle: H) -> Option<Instant> {
        self.entries
            .iter()
            .find(|entry| entry.handle == handle)
            .map(|entry| entry.deadline)
    }

    /// Whether `handle` has an entry.
    pub fn contains(&self, handle: H) -> bool {
        self.find(handle).is_some()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no deadlines are pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &TimerEntry<H>> + '_ {
        self.entries.iter()
    }

    /// Free every entry and the backing list. Returns how many were pending.
    pub fn release(self) -> usize {
        let pending = self.entries.len();
        let mut slot = Some(self.entries);
        OrderedList::free(&mut slot, Disposal::Free);
        pending
    }

    fn find(&self, handle: H) -> Option<NodeRef> {
        self.entries.references().find(|reference| {
            self.entries
                .element_at_reference(Some(*reference))
                .is_some_and(|entry| entry.handle == handle)
        })
    }
}

impl<H> Default for TimerQueue<H>
where
    H: Copy + Eq + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Copy + fmt::Debug> fmt::Debug for TimerQueue<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("len", &self.entries.len())
            .finish()
    }
}
