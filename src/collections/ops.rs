//! Element lifecycle operations for [`OrderedList`](super::OrderedList).
//!
//! A list is bound to one `ElementOps` value at construction. Every copy,
//! release and ordering decision the list makes goes through it.

use std::cmp::Ordering;
use std::fmt;

/// Copy, free and compare callbacks for the elements of a list.
pub trait ElementOps<T> {
    /// Produce an independent copy of `element` for storage in the list.
    fn copy(&self, element: &T) -> T;

    /// Release an element the list is discarding.
    ///
    /// The default simply drops it.
    fn free(&self, element: T) {
        drop(element);
    }

    /// Order two elements. `Ordering::Equal` is also the match criterion for
    /// element lookups.
    fn compare(&self, lhs: &T, rhs: &T) -> Ordering;
}

/// Uses `Clone` for copies and `Ord` for comparisons.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalOps;

impl<T: Clone + Ord> ElementOps<T> for NaturalOps {
    fn copy(&self, element: &T) -> T {
        element.clone()
    }

    fn compare(&self, lhs: &T, rhs: &T) -> Ordering {
        lhs.cmp(rhs)
    }
}

type CopyFn<T> = Box<dyn Fn(&T) -> T>;
type FreeFn<T> = Box<dyn Fn(T)>;
type CompareFn<T> = Box<dyn Fn(&T, &T) -> Ordering>;

/// Element operations assembled from three closures.
pub struct FnOps<T> {
    copy: CopyFn<T>,
    free: FreeFn<T>,
    compare: CompareFn<T>,
}

impl<T> FnOps<T> {
    /// Bundle the three callbacks.
    pub fn new(
        copy: impl Fn(&T) -> T + 'static,
        free: impl Fn(T) + 'static,
        compare: impl Fn(&T, &T) -> Ordering + 'static,
    ) -> Self {
        Self {
            copy: Box::new(copy),
            free: Box::new(free),
            compare: Box::new(compare),
        }
    }
}

impl<T> ElementOps<T> for FnOps<T> {
    fn copy(&self, element: &T) -> T {
        (self.copy)(element)
    }

    fn free(&self, element: T) {
        (self.free)(element)
    }

    fn compare(&self, lhs: &T, rhs: &T) -> Ordering {
        (self.compare)(lhs, rhs)
    }
}

impl<T> fmt::Debug for FnOps<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOps").finish_non_exhaustive()
    }
}

/// How an element enters the list.
#[derive(Debug)]
pub enum Insertion<'a, T> {
    /// Move the element in; the list takes exclusive ownership.
    Owned(T),
    /// Store `ElementOps::copy` of the element; the caller keeps the original.
    Copied(&'a T),
}

/// What happens to an element when its node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposal {
    /// Hand the element to `ElementOps::free`.
    Free,
    /// Return the element to the caller.
    Keep,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn natural_ops_clone_and_order() {
        let ops = NaturalOps;
        assert_eq!(ElementOps::<u32>::copy(&ops, &7), 7);
        assert_eq!(ops.compare(&1u32, &2u32), Ordering::Less);
        assert_eq!(ops.compare(&"b", &"a"), Ordering::Greater);
    }

    #[test]
    fn fn_ops_route_to_closures() {
        let freed = Rc::new(Cell::new(0));
        let counter = Rc::clone(&freed);
        let ops = FnOps::new(
            |v: &i32| v * 10,
            move |_v: i32| counter.set(counter.get() + 1),
            |a: &i32, b: &i32| b.cmp(a),
        );

        assert_eq!(ops.copy(&3), 30);
        assert_eq!(ops.compare(&1, &2), Ordering::Greater);
        ops.free(5);
        ops.free(6);
        assert_eq!(freed.get(), 2);
    }
}
