//! Persistent (immutable) ordered map based on a randomized treap.
//!
//! This module provides [`PersistentTreapMap`], an ordered map handle that
//! supports constant-time cloning through structural sharing and optional
//! release hooks that observe the end of a binding's lifetime.
//!
//! # Overview
//!
//! The map is a treap: a binary search tree on keys that is simultaneously a
//! max-heap on per-node random 64-bit weights. The random heap order keeps
//! the tree balanced in expectation without any deterministic rebalancing,
//! and makes the bulk [`insert_all`](PersistentTreapMap::insert_all) of two
//! independently built maps run in O(m log(n/m)) expected time.
//!
//! - O(1) `clone` and `is_empty`
//! - O(log N) expected `get`, `insert`, `remove`
//! - O(m log(n/m)) expected `insert_all`
//! - O(N) in-order traversal via [`for_each`](PersistentTreapMap::for_each)
//!
//! Every mutation rewrites only the path from the root to the touched node;
//! all untouched subtrees are shared between the old and new version. A
//! cloned handle therefore keeps observing exactly the bindings it held at
//! clone time, no matter how either handle is mutated afterwards.
//!
//! # Sharing and Release Hooks
//!
//! Sharing happens at two levels, both mediated by atomic reference counts:
//! tree nodes are shared across handles and versions, and the (key, value)
//! binding itself is shared across the shallow node copies that persistent
//! rewriting produces. A binding registered with
//! [`insert_with_release`](PersistentTreapMap::insert_with_release) invokes
//! its hook exactly once, at the moment the last node holding it is torn
//! down, on the thread that dropped the last reference.
//!
//! # Examples
//!
//! ```rust
//! use treapmap::PersistentTreapMap;
//!
//! let mut map = PersistentTreapMap::new();
//! map.insert(3, "three");
//! map.insert(1, "one");
//!
//! let snapshot = map.clone();
//! map.insert(2, "two");
//!
//! // Entries visit in ascending key order.
//! let mut keys = Vec::new();
//! map.for_each(|key, _| keys.push(*key));
//! assert_eq!(keys, vec![1, 2, 3]);
//!
//! // The snapshot still sees the pre-mutation bindings.
//! let mut snapshot_keys = Vec::new();
//! snapshot.for_each(|key, _| snapshot_keys.push(*key));
//! assert_eq!(snapshot_keys, vec![1, 3]);
//! ```

use std::fmt;

use crate::ordering::KeyOrdering;
use crate::ordering::NaturalOrdering;

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// Always `std::sync::Arc`: distinct handles (including clones) may live on
/// distinct threads, so both sharing levels require atomic counters.
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

// =============================================================================
// Release Hook
// =============================================================================

/// A client-supplied hook observing the end of a binding's lifetime.
///
/// The hook is invoked exactly once per binding, when no live handle and no
/// retained interior node references the binding anymore. It runs
/// synchronously on the thread that dropped the last reference, which is
/// either inside the mutating call that displaced the binding or inside the
/// drop of the last handle that held it. The hook must not mutate the map it
/// was registered on.
///
/// # Examples
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use treapmap::PersistentTreapMap;
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&log);
///
/// let mut map = PersistentTreapMap::new();
/// map.insert_with_release(1, "a", move |key, value| {
///     sink.lock().unwrap().push((*key, *value));
/// });
///
/// // Overwriting evicts the old binding once nothing references it.
/// map.insert(1, "b");
/// assert_eq!(log.lock().unwrap().as_slice(), &[(1, "a")]);
/// ```
pub type ReleaseHook<K, V> = Box<dyn Fn(&K, &V) + Send + Sync>;

// =============================================================================
// Entry Definition
// =============================================================================

/// A reference-counted (key, value) binding, shared across the node versions
/// that persistent rewriting produces.
struct Entry<K, V> {
    key: K,
    value: V,
    release: Option<ReleaseHook<K, V>>,
}

impl<K, V> Drop for Entry<K, V> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(&self.key, &self.value);
        }
    }
}

// =============================================================================
// Node Definition
// =============================================================================

/// Internal treap node.
///
/// The node's key for ordering purposes is its entry's key. The weight is
/// assigned at creation and never changes while the node is reachable.
struct Node<K, V> {
    entry: ReferenceCounter<Entry<K, V>>,
    weight: u64,
    left: Option<ReferenceCounter<Self>>,
    right: Option<ReferenceCounter<Self>>,
}

impl<K, V> Node<K, V> {
    /// Creates a fresh singleton node owning a fresh entry.
    fn new(key: K, value: V, release: Option<ReleaseHook<K, V>>) -> Self {
        Self {
            entry: ReferenceCounter::new(Entry {
                key,
                value,
                release,
            }),
            weight: rand::random(),
            left: None,
            right: None,
        }
    }

    /// Creates an unshared copy of this node with the same entry reference
    /// and weight but no children. The caller installs the children.
    fn shallow_clone(&self) -> Self {
        Self {
            entry: self.entry.clone(),
            weight: self.weight,
            left: None,
            right: None,
        }
    }
}

// =============================================================================
// PersistentTreapMap Definition
// =============================================================================

/// A persistent ordered map with constant-time cloning and release hooks.
///
/// `PersistentTreapMap` is a handle onto a shared, immutable treap. Mutating
/// methods take `&mut self` and install a freshly built root; they never
/// modify nodes reachable from other handles, so a [`Clone`] of the handle
/// is an independent snapshot that two threads may use concurrently.
///
/// Key comparison is an injected capability: the default
/// [`NaturalOrdering`] delegates to [`Ord`], and
/// [`with_ordering`](Self::with_ordering) accepts any
/// [`KeyOrdering`] implementation, including plain closures. Key equality is
/// derived from the predicate, so at most one binding exists per equivalence
/// class. Handles combined with [`insert_all`](Self::insert_all) must agree
/// on their ordering.
///
/// # Time Complexity
///
/// | Operation          | Complexity            |
/// |--------------------|-----------------------|
/// | `new`              | O(1)                  |
/// | `clone`            | O(1)                  |
/// | `is_empty`         | O(1)                  |
/// | `get`              | O(log N) expected     |
/// | `insert`           | O(log N) expected     |
/// | `remove`           | O(log N) expected     |
/// | `insert_all`       | O(m log(n/m)) expected|
/// | `for_each`         | O(N)                  |
///
/// # Examples
///
/// ```rust
/// use treapmap::PersistentTreapMap;
///
/// let mut map = PersistentTreapMap::new();
/// map.insert(2, "two");
/// map.insert(1, "one");
///
/// assert_eq!(map.get(&1), Some(&"one"));
/// assert_eq!(map.get(&3), None);
///
/// let snapshot = map.clone();
/// map.remove(&1);
/// assert_eq!(map.get(&1), None);
/// assert_eq!(snapshot.get(&1), Some(&"one")); // Snapshot unchanged
/// ```
pub struct PersistentTreapMap<K, V, C = NaturalOrdering> {
    /// Root node of the treap
    root: Option<ReferenceCounter<Node<K, V>>>,
    /// Injected comparison capability, fixed for the handle's lifetime
    ordering: C,
}

/// An owned reference to a subtree root, or `None` for the empty subtree.
type Subtree<K, V> = Option<ReferenceCounter<Node<K, V>>>;

impl<K, V> PersistentTreapMap<K, V> {
    /// Creates a new empty map ordered by [`Ord`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapmap::PersistentTreapMap;
    ///
    /// let map: PersistentTreapMap<i32, String> = PersistentTreapMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: None,
            ordering: NaturalOrdering,
        }
    }
}

impl<K: Ord, V> PersistentTreapMap<K, V> {
    /// Creates a map containing a single binding.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapmap::PersistentTreapMap;
    ///
    /// let map = PersistentTreapMap::singleton(42, "answer");
    /// assert_eq!(map.get(&42), Some(&"answer"));
    /// ```
    #[inline]
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        let mut map = Self::new();
        map.insert(key, value);
        map
    }
}

impl<K, V, C> PersistentTreapMap<K, V, C> {
    /// Creates a new empty map with an injected ordering capability.
    ///
    /// The capability is fixed for the handle's lifetime and is copied into
    /// every clone of the handle.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapmap::{OrderingFn, PersistentTreapMap};
    ///
    /// // Reverse ordering via a closure predicate.
    /// let mut map = PersistentTreapMap::with_ordering(OrderingFn(|a: &i32, b: &i32| b < a));
    /// map.insert(1, "one");
    /// map.insert(3, "three");
    /// map.insert(2, "two");
    ///
    /// let mut keys = Vec::new();
    /// map.for_each(|key, _| keys.push(*key));
    /// assert_eq!(keys, vec![3, 2, 1]);
    /// ```
    #[inline]
    #[must_use]
    pub const fn with_ordering(ordering: C) -> Self {
        Self {
            root: None,
            ordering,
        }
    }

    /// Returns `true` if the map contains no bindings.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapmap::PersistentTreapMap;
    ///
    /// let mut map = PersistentTreapMap::new();
    /// assert!(map.is_empty());
    /// map.insert(1, "one");
    /// assert!(!map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Removes all bindings from the map.
    ///
    /// The handle stays usable afterwards. Bindings that are not referenced
    /// by any other handle have their release hooks invoked during the call.
    /// Clearing an already empty map is a no-op.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapmap::PersistentTreapMap;
    ///
    /// let mut map = PersistentTreapMap::new();
    /// map.insert(1, "one");
    /// map.clear();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    pub fn clear(&mut self) {
        self.root = None;
    }

    /// Calls `visitor` for every binding in ascending key order.
    ///
    /// The `&self` borrow guarantees the map cannot be mutated while the
    /// traversal runs. No reference counts are touched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapmap::PersistentTreapMap;
    ///
    /// let mut map = PersistentTreapMap::new();
    /// map.insert(3, "c");
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    ///
    /// let mut entries = Vec::new();
    /// map.for_each(|key, value| entries.push((*key, *value)));
    /// assert_eq!(entries, vec![(1, "a"), (2, "b"), (3, "c")]);
    /// ```
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&K, &V),
    {
        Self::for_each_node(self.root.as_ref(), &mut visitor);
    }

    /// Recursive in-order traversal helper.
    fn for_each_node<F>(node: Option<&ReferenceCounter<Node<K, V>>>, visitor: &mut F)
    where
        F: FnMut(&K, &V),
    {
        if let Some(node_ref) = node {
            Self::for_each_node(node_ref.left.as_ref(), visitor);
            visitor(&node_ref.entry.key, &node_ref.entry.value);
            Self::for_each_node(node_ref.right.as_ref(), visitor);
        }
    }
}

impl<K, V, C: KeyOrdering<K>> PersistentTreapMap<K, V, C> {
    /// Returns a reference to the value bound to the key, or `None`.
    ///
    /// Read-only: no reference counts are touched.
    ///
    /// # Complexity
    ///
    /// O(log N) expected
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapmap::PersistentTreapMap;
    ///
    /// let mut map = PersistentTreapMap::new();
    /// map.insert("hello".to_string(), 42);
    ///
    /// assert_eq!(map.get(&"hello".to_string()), Some(&42));
    /// assert_eq!(map.get(&"world".to_string()), None);
    /// ```
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        Self::get_from_node(self.root.as_ref(), key, &self.ordering)
    }

    /// Recursive helper for get.
    fn get_from_node<'a>(
        node: Option<&'a ReferenceCounter<Node<K, V>>>,
        key: &K,
        ordering: &C,
    ) -> Option<&'a V> {
        node.and_then(|node_ref| {
            if ordering.less(key, &node_ref.entry.key) {
                Self::get_from_node(node_ref.left.as_ref(), key, ordering)
            } else if ordering.less(&node_ref.entry.key, key) {
                Self::get_from_node(node_ref.right.as_ref(), key, ordering)
            } else {
                Some(&node_ref.entry.value)
            }
        })
    }

    /// Returns `true` if the map contains a binding for the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapmap::PersistentTreapMap;
    ///
    /// let mut map = PersistentTreapMap::new();
    /// map.insert(1, "one");
    ///
    /// assert!(map.contains_key(&1));
    /// assert!(!map.contains_key(&2));
    /// ```
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Binds `value` to `key`, overwriting any existing binding.
    ///
    /// Other handles sharing structure with this one are unaffected. If the
    /// displaced binding carried a release hook and no other handle still
    /// references it, the hook fires during this call.
    ///
    /// # Complexity
    ///
    /// O(log N) expected
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapmap::PersistentTreapMap;
    ///
    /// let mut map = PersistentTreapMap::new();
    /// map.insert(1, "one");
    /// map.insert(1, "ONE");
    /// assert_eq!(map.get(&1), Some(&"ONE"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) {
        self.insert_entry(key, value, None);
    }

    /// Binds `value` to `key` and registers a release hook for the binding.
    ///
    /// The hook is invoked exactly once, when the binding is no longer
    /// referenced by this handle, any clone, or any retained interior node:
    /// on overwrite, on [`remove`](Self::remove), on
    /// [`clear`](Self::clear), or when the last handle holding the binding
    /// is dropped. See [`ReleaseHook`] for the execution contract.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::{Arc, Mutex};
    /// use treapmap::PersistentTreapMap;
    ///
    /// let log = Arc::new(Mutex::new(Vec::new()));
    /// let sink = Arc::clone(&log);
    ///
    /// let mut map = PersistentTreapMap::new();
    /// map.insert_with_release(1, "a", move |key, value| {
    ///     sink.lock().unwrap().push((*key, *value));
    /// });
    ///
    /// let snapshot = map.clone();
    /// map.remove(&1);
    /// assert!(log.lock().unwrap().is_empty()); // Snapshot still holds it
    ///
    /// drop(snapshot);
    /// assert_eq!(log.lock().unwrap().as_slice(), &[(1, "a")]);
    /// ```
    pub fn insert_with_release<F>(&mut self, key: K, value: V, release: F)
    where
        F: Fn(&K, &V) + Send + Sync + 'static,
    {
        self.insert_entry(key, value, Some(Box::new(release)));
    }

    /// Shared insert path: build a fresh singleton, union it over the root.
    fn insert_entry(&mut self, key: K, value: V, release: Option<ReleaseHook<K, V>>) {
        let singleton = Some(ReferenceCounter::new(Node::new(key, value, release)));
        let new_root = Self::union(self.root.as_ref(), singleton.as_ref(), &self.ordering, true);
        self.root = new_root;
    }

    /// Removes the binding for `key`, if any.
    ///
    /// Removing an absent key leaves the map untouched. If the removed
    /// binding carried a release hook and no other handle still references
    /// it, the hook fires during this call.
    ///
    /// # Complexity
    ///
    /// O(log N) expected
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapmap::PersistentTreapMap;
    ///
    /// let mut map = PersistentTreapMap::new();
    /// map.insert(1, "one");
    /// map.insert(2, "two");
    ///
    /// map.remove(&1);
    /// assert_eq!(map.get(&1), None);
    /// assert_eq!(map.get(&2), Some(&"two"));
    ///
    /// map.remove(&99); // Absent key: no-op
    /// assert!(!map.is_empty());
    /// ```
    pub fn remove(&mut self, key: &K) {
        let (left, mid, right) = Self::split(self.root.as_ref(), key, &self.ordering, true);
        if mid.is_none() {
            return;
        }
        let new_root = Self::merge(left.as_ref(), right.as_ref());
        self.root = new_root;
    }

    /// Copies every binding of `other` into this map, overwriting on
    /// collision.
    ///
    /// Equivalent to inserting each of `other`'s bindings individually, but
    /// runs in O(m log(n/m)) expected time by merging the two treaps
    /// structurally. `other` is not consumed and keeps its contents. Both
    /// maps must use the same ordering, otherwise the result is unspecified.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use treapmap::PersistentTreapMap;
    ///
    /// let mut first = PersistentTreapMap::new();
    /// first.insert(1, "a");
    /// first.insert(2, "b");
    ///
    /// let mut second = PersistentTreapMap::new();
    /// second.insert(2, "B");
    /// second.insert(3, "c");
    ///
    /// first.insert_all(&second);
    ///
    /// assert_eq!(first.get(&1), Some(&"a"));
    /// assert_eq!(first.get(&2), Some(&"B")); // Collision: `other` wins
    /// assert_eq!(first.get(&3), Some(&"c"));
    /// assert_eq!(second.get(&2), Some(&"B")); // `other` unchanged
    /// ```
    pub fn insert_all(&mut self, other: &Self) {
        let new_root = Self::union(self.root.as_ref(), other.root.as_ref(), &self.ordering, true);
        self.root = new_root;
    }

    // =========================================================================
    // Treap Primitives
    // =========================================================================
    //
    // All three primitives borrow their arguments and return owned
    // references: the returned subtrees each carry their own count
    // contribution, and dropping them is the release.

    /// Partitions `node` into the subtrees strictly below `key`, the node
    /// equal to `key` (or `None`), and the subtrees strictly above `key`.
    ///
    /// With `require_mid` set, an absent key collapses the whole result to
    /// three `None`s; partial sub-results built by deeper recursion levels
    /// are dropped on the way out.
    fn split(
        node: Option<&ReferenceCounter<Node<K, V>>>,
        key: &K,
        ordering: &C,
        require_mid: bool,
    ) -> (Subtree<K, V>, Subtree<K, V>, Subtree<K, V>) {
        let Some(node_ref) = node else {
            return (None, None, None);
        };

        if ordering.less(&node_ref.entry.key, key) {
            let (left, mid, right) =
                Self::split(node_ref.right.as_ref(), key, ordering, require_mid);
            if require_mid && mid.is_none() {
                return (None, None, None);
            }
            let mut outer = node_ref.shallow_clone();
            outer.left = node_ref.left.clone();
            outer.right = left;
            (Some(ReferenceCounter::new(outer)), mid, right)
        } else if ordering.less(key, &node_ref.entry.key) {
            let (left, mid, right) = Self::split(node_ref.left.as_ref(), key, ordering, require_mid);
            if require_mid && mid.is_none() {
                return (None, None, None);
            }
            let mut outer = node_ref.shallow_clone();
            outer.left = right;
            outer.right = node_ref.right.clone();
            (left, mid, Some(ReferenceCounter::new(outer)))
        } else {
            (
                node_ref.left.clone(),
                Some(ReferenceCounter::new(node_ref.shallow_clone())),
                node_ref.right.clone(),
            )
        }
    }

    /// Merges two treaps into one, preserving the heap order on weights.
    ///
    /// Precondition: every key in `left` is strictly less than every key in
    /// `right`.
    fn merge(
        left: Option<&ReferenceCounter<Node<K, V>>>,
        right: Option<&ReferenceCounter<Node<K, V>>>,
    ) -> Subtree<K, V> {
        match (left, right) {
            (None, _) => right.cloned(),
            (_, None) => left.cloned(),
            (Some(left_node), Some(right_node)) => {
                if left_node.weight > right_node.weight {
                    let mut root = left_node.shallow_clone();
                    root.left = left_node.left.clone();
                    root.right = Self::merge(left_node.right.as_ref(), right);
                    Some(ReferenceCounter::new(root))
                } else {
                    let mut root = right_node.shallow_clone();
                    root.left = Self::merge(left, right_node.left.as_ref());
                    root.right = right_node.right.clone();
                    Some(ReferenceCounter::new(root))
                }
            }
        }
    }

    /// Unions two treaps. On key collision, `second`'s value wins when
    /// `overwrite` is set, `first`'s otherwise.
    ///
    /// The heavier root becomes the result root; swapping the sides to
    /// normalize flips `overwrite` so the collision semantics survive the
    /// swap. The result root always takes the primary side's weight, even
    /// when its entry comes from the secondary side.
    fn union(
        first: Option<&ReferenceCounter<Node<K, V>>>,
        second: Option<&ReferenceCounter<Node<K, V>>>,
        ordering: &C,
        overwrite: bool,
    ) -> Subtree<K, V> {
        let (mut primary, mut secondary) = match (first, second) {
            (None, _) => return second.cloned(),
            (_, None) => return first.cloned(),
            (Some(first_node), Some(second_node)) => (first_node, second_node),
        };
        let mut overwrite = overwrite;
        if primary.weight < secondary.weight {
            std::mem::swap(&mut primary, &mut secondary);
            overwrite = !overwrite;
        }

        let (left, mid, right) =
            Self::split(Some(secondary), &primary.entry.key, ordering, false);
        let mut root = match (overwrite, mid.as_ref()) {
            (true, Some(mid_node)) => mid_node.shallow_clone(),
            _ => primary.shallow_clone(),
        };
        root.weight = primary.weight;
        root.left = Self::union(primary.left.as_ref(), left.as_ref(), ordering, overwrite);
        root.right = Self::union(primary.right.as_ref(), right.as_ref(), ordering, overwrite);
        Some(ReferenceCounter::new(root))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<K, V, C: Clone> Clone for PersistentTreapMap<K, V, C> {
    /// Clones the handle in O(1).
    ///
    /// The clone shares the entire tree with the original; each handle
    /// subsequently rewrites only its own root pointer, so mutations on one
    /// are never visible through the other.
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            ordering: self.ordering.clone(),
        }
    }
}

impl<K, V, C: Default> Default for PersistentTreapMap<K, V, C> {
    #[inline]
    fn default() -> Self {
        Self::with_ordering(C::default())
    }
}

impl<K, V, C> FromIterator<(K, V)> for PersistentTreapMap<K, V, C>
where
    C: KeyOrdering<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_ordering(C::default());
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K, V, C: KeyOrdering<K>> Extend<(K, V)> for PersistentTreapMap<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

/// Two maps are equal when they hold equal bindings for the same keys.
///
/// Both maps must use the same ordering for the comparison to be meaningful.
impl<K, V: PartialEq, C: KeyOrdering<K>> PartialEq for PersistentTreapMap<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        let mut entries_match = true;
        let mut self_count = 0_usize;
        self.for_each(|key, value| {
            self_count += 1;
            if entries_match && other.get(key) != Some(value) {
                entries_match = false;
            }
        });
        if !entries_match {
            return false;
        }
        let mut other_count = 0_usize;
        other.for_each(|_, _| other_count += 1);
        self_count == other_count
    }
}

impl<K, V: Eq, C: KeyOrdering<K>> Eq for PersistentTreapMap<K, V, C> {}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for PersistentTreapMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = formatter.debug_map();
        self.for_each(|key, value| {
            builder.entry(key, value);
        });
        builder.finish()
    }
}

/// Renders the map as `{key: value, ...}` in ascending key order.
///
/// Diagnostic output only; no stability contract beyond readability.
impl<K: fmt::Display, V: fmt::Display, C> fmt::Display for PersistentTreapMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        let mut result = Ok(());
        self.for_each(|key, value| {
            if result.is_ok() {
                let separator = if first { "" } else { ", " };
                first = false;
                result = write!(formatter, "{separator}{key}: {value}");
            }
        });
        result?;
        write!(formatter, "}}")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K, V, C> serde::Serialize for PersistentTreapMap<K, V, C>
where
    K: serde::Serialize,
    V: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        let mut result = Ok(());
        self.for_each(|key, value| {
            if result.is_ok() {
                result = map.serialize_entry(key, value);
            }
        });
        result?;
        map.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentTreapMapVisitor<K, V, C> {
    key_marker: std::marker::PhantomData<K>,
    value_marker: std::marker::PhantomData<V>,
    ordering_marker: std::marker::PhantomData<C>,
}

#[cfg(feature = "serde")]
impl<K, V, C> PersistentTreapMapVisitor<K, V, C> {
    const fn new() -> Self {
        Self {
            key_marker: std::marker::PhantomData,
            value_marker: std::marker::PhantomData,
            ordering_marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, C> serde::de::Visitor<'de> for PersistentTreapMapVisitor<K, V, C>
where
    K: serde::Deserialize<'de>,
    V: serde::Deserialize<'de>,
    C: KeyOrdering<K> + Default,
{
    type Value = PersistentTreapMap<K, V, C>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        // Sequential insert: later duplicates overwrite earlier ones.
        let mut map = PersistentTreapMap::with_ordering(C::default());
        while let Some((key, value)) = access.next_entry()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, C> serde::Deserialize<'de> for PersistentTreapMap<K, V, C>
where
    K: serde::Deserialize<'de>,
    V: serde::Deserialize<'de>,
    C: KeyOrdering<K> + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentTreapMapVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================
