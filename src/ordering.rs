//! Key ordering capabilities.
//!
//! This module provides [`KeyOrdering`], the comparison capability injected
//! into [`PersistentTreapMap`](crate::PersistentTreapMap) at construction
//! time. The map derives key equality from the predicate itself:
//! `a` and `b` are equivalent when `!less(a, b) && !less(b, a)`, so no
//! separate equality capability is needed.
//!
//! # Strict Weak Order
//!
//! The predicate must be a strict weak order: irreflexive, asymmetric, and
//! transitive, with transitive equivalence. The map never validates the
//! predicate; a broken ordering yields unspecified map contents (entries may
//! be misplaced or shadowed), though never memory unsafety.
//!
//! # Examples
//!
//! ```rust
//! use treapmap::{KeyOrdering, NaturalOrdering, OrderingFn};
//!
//! // The built-in ordering delegates to `Ord`.
//! assert!(NaturalOrdering.less(&1, &2));
//! assert!(!NaturalOrdering.less(&2, &1));
//!
//! // Any `Fn(&K, &K) -> bool` closure works through `OrderingFn`.
//! let reverse = OrderingFn(|a: &i32, b: &i32| b < a);
//! assert!(reverse.less(&2, &1));
//! ```

/// A strict-weak-order comparison capability over keys of type `K`.
///
/// Implementations are injected into a map at construction and must remain
/// fixed for the lifetime of the map; two maps combined with
/// [`insert_all`](crate::PersistentTreapMap::insert_all) must agree on their
/// ordering.
pub trait KeyOrdering<K> {
    /// Returns `true` if `a` is strictly less than `b`.
    fn less(&self, a: &K, b: &K) -> bool;
}

/// The natural ordering of keys that implement [`Ord`].
///
/// This is the default ordering parameter of
/// [`PersistentTreapMap`](crate::PersistentTreapMap).
///
/// # Examples
///
/// ```rust
/// use treapmap::{KeyOrdering, NaturalOrdering};
///
/// assert!(NaturalOrdering.less(&"apple", &"banana"));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaturalOrdering;

impl<K: Ord> KeyOrdering<K> for NaturalOrdering {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        a < b
    }
}

/// Adapts a `less` predicate closure into a [`KeyOrdering`] capability.
///
/// # Examples
///
/// ```rust
/// use treapmap::{OrderingFn, PersistentTreapMap};
///
/// let mut map = PersistentTreapMap::with_ordering(OrderingFn(|a: &i32, b: &i32| b < a));
/// map.insert(1, "one");
/// map.insert(2, "two");
///
/// let mut keys = Vec::new();
/// map.for_each(|key, _| keys.push(*key));
/// assert_eq!(keys, vec![2, 1]);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderingFn<F>(pub F);

impl<K, F> KeyOrdering<K> for OrderingFn<F>
where
    F: Fn(&K, &K) -> bool,
{
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        (self.0)(a, b)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_natural_ordering_agrees_with_ord() {
        assert!(NaturalOrdering.less(&1, &2));
        assert!(!NaturalOrdering.less(&2, &2));
        assert!(!NaturalOrdering.less(&3, &2));
    }

    #[rstest]
    fn test_closure_ordering() {
        let reverse = OrderingFn(|a: &i32, b: &i32| b < a);
        assert!(reverse.less(&5, &3));
        assert!(!reverse.less(&3, &3));
        assert!(!reverse.less(&3, &5));
    }

    #[rstest]
    fn test_derived_equivalence() {
        let by_length = OrderingFn(|a: &&str, b: &&str| a.len() < b.len());
        // "abc" and "xyz" are equivalent under length ordering.
        assert!(!by_length.less(&"abc", &"xyz"));
        assert!(!by_length.less(&"xyz", &"abc"));
    }
}
