//! # treapmap
//!
//! A persistent ordered map based on a randomized treap, with structural
//! sharing, constant-time cloning, and release hooks that observe the end of
//! a binding's lifetime.
//!
//! ## Overview
//!
//! [`PersistentTreapMap`] is a handle onto an immutable tree. Mutations
//! rewrite only the path from the root to the touched node and install a new
//! root into the handle; everything else is shared. Cloning a handle is O(1)
//! and yields an independent snapshot: mutations on either handle are never
//! visible through the other, and distinct handles may be used concurrently
//! from distinct threads.
//!
//! Balance is probabilistic. Every node carries a random 64-bit weight and
//! the tree is a max-heap on those weights, which keeps point operations
//! logarithmic in expectation and lets two independently built maps merge in
//! O(m log(n/m)) expected time.
//!
//! A binding registered through
//! [`insert_with_release`](PersistentTreapMap::insert_with_release) has its
//! hook invoked exactly once, when the binding becomes unreachable from
//! every live handle. This suits maps that own external resources such as
//! file handles or foreign allocations.
//!
//! ## Feature Flags
//!
//! - `serde`: `Serialize`/`Deserialize` implementations for the map
//!
//! ## Example
//!
//! ```rust
//! use treapmap::PersistentTreapMap;
//!
//! let mut map = PersistentTreapMap::new();
//! map.insert(3, "three");
//! map.insert(1, "one");
//! map.insert(2, "two");
//!
//! let snapshot = map.clone();
//! map.remove(&2);
//!
//! assert_eq!(map.get(&2), None);
//! assert_eq!(snapshot.get(&2), Some(&"two"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod map;
mod ordering;

pub use map::PersistentTreapMap;
pub use map::ReleaseHook;
pub use ordering::KeyOrdering;
pub use ordering::NaturalOrdering;
pub use ordering::OrderingFn;

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use treapmap::prelude::*;
///
/// let mut map = PersistentTreapMap::new();
/// map.insert(1, "one");
/// assert!(map.contains_key(&1));
/// ```
pub mod prelude {
    pub use crate::KeyOrdering;
    pub use crate::NaturalOrdering;
    pub use crate::OrderingFn;
    pub use crate::PersistentTreapMap;
    pub use crate::ReleaseHook;
}
