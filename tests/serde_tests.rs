#![cfg(feature = "serde")]
//! Serde integration tests for `PersistentTreapMap`.

use rstest::rstest;
use treapmap::PersistentTreapMap;

#[rstest]
fn test_json_round_trip() {
    let mut map: PersistentTreapMap<String, i32> = PersistentTreapMap::new();
    map.insert("one".to_string(), 1);
    map.insert("two".to_string(), 2);

    let json = serde_json::to_string(&map).unwrap();
    let restored: PersistentTreapMap<String, i32> = serde_json::from_str(&json).unwrap();
    assert_eq!(map, restored);
}

#[rstest]
fn test_empty_map_round_trip() {
    let map: PersistentTreapMap<String, i32> = PersistentTreapMap::new();
    let json = serde_json::to_string(&map).unwrap();
    assert_eq!(json, "{}");
    let restored: PersistentTreapMap<String, i32> = serde_json::from_str(&json).unwrap();
    assert!(restored.is_empty());
}

#[rstest]
fn test_serializes_in_key_order() {
    let mut map = PersistentTreapMap::new();
    map.insert("c".to_string(), 3);
    map.insert("a".to_string(), 1);
    map.insert("b".to_string(), 2);

    let json = serde_json::to_string(&map).unwrap();
    assert_eq!(json, r#"{"a":1,"b":2,"c":3}"#);
}

#[rstest]
fn test_entry_preservation_for_large_maps() {
    let mut map: PersistentTreapMap<String, i32> = PersistentTreapMap::new();
    for element_index in 0..100 {
        map.insert(format!("key{element_index}"), element_index);
    }
    let json = serde_json::to_string(&map).unwrap();
    let restored: PersistentTreapMap<String, i32> = serde_json::from_str(&json).unwrap();
    for element_index in 0..100 {
        let key = format!("key{element_index}");
        assert_eq!(restored.get(&key), Some(&element_index));
    }
}

#[rstest]
fn test_serialize_nested_values() {
    let mut map = PersistentTreapMap::new();
    map.insert("numbers".to_string(), vec![1, 2, 3]);
    map.insert("empty".to_string(), vec![]);

    let json = serde_json::to_string(&map).unwrap();
    let restored: PersistentTreapMap<String, Vec<i32>> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.get(&"numbers".to_string()), Some(&vec![1, 2, 3]));
    assert_eq!(restored.get(&"empty".to_string()), Some(&vec![]));
}

#[rstest]
fn test_deserialize_overwrites_duplicate_keys() {
    let json = r#"{"key":1,"key":2}"#;
    let map: PersistentTreapMap<String, i32> = serde_json::from_str(json).unwrap();
    assert_eq!(map.get(&"key".to_string()), Some(&2));
}
