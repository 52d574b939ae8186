//! Release hook accounting tests.
//!
//! A binding's hook must fire exactly once, and only once no live handle and
//! no retained interior node can still observe the binding.

use rstest::rstest;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use treapmap::PersistentTreapMap;

// =============================================================================
// Logging Helpers
// =============================================================================

/// Shared log of released (key, value) pairs, in release order.
#[derive(Clone, Default)]
struct ReleaseLog {
    released: Arc<Mutex<Vec<(i32, &'static str)>>>,
}

impl ReleaseLog {
    fn hook(&self) -> impl Fn(&i32, &&'static str) + Send + Sync + use<> {
        let sink = Arc::clone(&self.released);
        move |key, value| sink.lock().unwrap().push((*key, *value))
    }

    fn entries(&self) -> Vec<(i32, &'static str)> {
        self.released.lock().unwrap().clone()
    }
}

// =============================================================================
// Overwrite Accounting
// =============================================================================

#[rstest]
fn test_overwrite_releases_the_displaced_binding() {
    let log = ReleaseLog::default();
    let mut map = PersistentTreapMap::new();

    map.insert_with_release(1, "a", log.hook());
    map.insert_with_release(1, "b", log.hook());
    assert_eq!(log.entries(), vec![(1, "a")]);

    map.clear();
    assert_eq!(log.entries(), vec![(1, "a"), (1, "b")]);
}

#[rstest]
fn test_overwrite_without_hook_releases_nothing_new() {
    let log = ReleaseLog::default();
    let mut map = PersistentTreapMap::new();

    map.insert(1, "plain");
    map.insert_with_release(1, "hooked", log.hook());
    assert_eq!(log.entries(), vec![]);

    map.insert(1, "plain again");
    assert_eq!(log.entries(), vec![(1, "hooked")]);
}

// =============================================================================
// Remove and Clear Accounting
// =============================================================================

#[rstest]
fn test_remove_releases_the_binding() {
    let log = ReleaseLog::default();
    let mut map = PersistentTreapMap::new();

    map.insert_with_release(1, "a", log.hook());
    map.remove(&1);
    assert_eq!(log.entries(), vec![(1, "a")]);
}

#[rstest]
fn test_remove_of_an_absent_key_releases_nothing() {
    let log = ReleaseLog::default();
    let mut map = PersistentTreapMap::new();

    map.insert_with_release(1, "a", log.hook());
    map.remove(&2);
    assert_eq!(log.entries(), vec![]);
}

#[rstest]
fn test_clear_releases_every_binding_once() {
    let log = ReleaseLog::default();
    let mut map = PersistentTreapMap::new();

    map.insert_with_release(1, "a", log.hook());
    map.insert_with_release(2, "b", log.hook());
    map.insert_with_release(3, "c", log.hook());
    map.clear();

    let mut entries = log.entries();
    entries.sort_unstable();
    assert_eq!(entries, vec![(1, "a"), (2, "b"), (3, "c")]);
}

#[rstest]
fn test_dropping_the_handle_releases_every_binding_once() {
    let log = ReleaseLog::default();
    {
        let mut map = PersistentTreapMap::new();
        map.insert_with_release(1, "a", log.hook());
        map.insert_with_release(2, "b", log.hook());
        assert_eq!(log.entries(), vec![]);
    }
    let mut entries = log.entries();
    entries.sort_unstable();
    assert_eq!(entries, vec![(1, "a"), (2, "b")]);
}

// =============================================================================
// Clone Accounting
// =============================================================================

#[rstest]
fn test_binding_survives_while_any_clone_holds_it() {
    let log = ReleaseLog::default();
    let mut map = PersistentTreapMap::new();
    map.insert_with_release(1, "a", log.hook());

    let snapshot = map.clone();
    map.clear();
    assert_eq!(log.entries(), vec![]);

    drop(snapshot);
    assert_eq!(log.entries(), vec![(1, "a")]);
}

#[rstest]
fn test_overwrite_on_a_clone_does_not_release_the_shared_binding() {
    let log = ReleaseLog::default();
    let mut map = PersistentTreapMap::new();
    map.insert_with_release(1, "a", log.hook());

    let mut snapshot = map.clone();
    snapshot.insert(1, "b");
    // The original still holds the old binding.
    assert_eq!(log.entries(), vec![]);

    drop(map);
    assert_eq!(log.entries(), vec![(1, "a")]);
    assert_eq!(snapshot.get(&1), Some(&"b"));
}

#[rstest]
fn test_every_handle_that_ever_held_the_binding_must_go() {
    let log = ReleaseLog::default();
    let mut map = PersistentTreapMap::new();
    map.insert_with_release(1, "a", log.hook());

    let first = map.clone();
    let second = map.clone();
    let third = first.clone();

    map.clear();
    drop(first);
    drop(third);
    assert_eq!(log.entries(), vec![]);

    drop(second);
    assert_eq!(log.entries(), vec![(1, "a")]);
}

#[rstest]
fn test_insert_all_shares_bindings_instead_of_releasing() {
    let log = ReleaseLog::default();
    let mut first = PersistentTreapMap::new();
    let mut second = PersistentTreapMap::new();
    first.insert_with_release(1, "a", log.hook());
    second.insert_with_release(1, "A", log.hook());
    second.insert_with_release(2, "b", log.hook());

    // Overwrite displaces first's binding for key 1, but first still holds it.
    let mut combined = first.clone();
    combined.insert_all(&second);
    assert_eq!(log.entries(), vec![]);
    assert_eq!(combined.get(&1), Some(&"A"));

    drop(first);
    assert_eq!(log.entries(), vec![(1, "a")]);

    drop(second);
    assert_eq!(log.entries(), vec![(1, "a")]);

    drop(combined);
    let mut entries = log.entries();
    entries.sort_unstable();
    assert_eq!(entries, vec![(1, "A"), (1, "a"), (2, "b")]);
}

// =============================================================================
// Stress Accounting
// =============================================================================

/// Inserts 10,000 random unique keys while taking 50 interleaved snapshots,
/// deletes half the keys, then destroys the snapshots in random order. Every
/// binding must release exactly once, and every snapshot must yield a
/// strictly ascending key sequence.
#[rstest]
fn test_stress_release_exactly_once_with_snapshots() {
    use rand::SeedableRng;
    use rand::seq::SliceRandom;

    let mut generator = rand::rngs::StdRng::seed_from_u64(42);

    let release_counts: Arc<Mutex<HashMap<i32, u32>>> = Arc::new(Mutex::new(HashMap::new()));
    let count_release = |counts: &Arc<Mutex<HashMap<i32, u32>>>| {
        let sink = Arc::clone(counts);
        move |key: &i32, _value: &i32| {
            *sink.lock().unwrap().entry(*key).or_insert(0) += 1;
        }
    };

    let mut keys: Vec<i32> = (0..10_000).collect();
    keys.shuffle(&mut generator);

    let mut map = PersistentTreapMap::new();
    let mut snapshots = Vec::new();
    for (index, key) in keys.iter().enumerate() {
        map.insert_with_release(*key, *key * 2, count_release(&release_counts));
        if index % 200 == 0 && snapshots.len() < 50 {
            snapshots.push(map.clone());
        }
    }

    let (to_delete, _) = keys.split_at(keys.len() / 2);
    for key in to_delete {
        map.remove(key);
    }

    // While the snapshots live, nothing the snapshots hold may release.
    for snapshot in &snapshots {
        let mut previous = None;
        snapshot.for_each(|key, value| {
            assert_eq!(*value, *key * 2);
            if let Some(previous_key) = previous {
                assert!(previous_key < *key, "snapshot keys out of order");
            }
            previous = Some(*key);
        });
    }

    snapshots.shuffle(&mut generator);
    for snapshot in snapshots {
        drop(snapshot);
    }
    drop(map);

    let counts = release_counts.lock().unwrap();
    assert_eq!(counts.len(), 10_000);
    for key in 0..10_000 {
        assert_eq!(counts.get(&key), Some(&1), "key {key} released {:?} times", counts.get(&key));
    }
}
