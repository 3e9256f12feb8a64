//! Typed JSON records on top of a [`KeyValueStore`].

use crate::store::KeyValueStore;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Read and decode the record under `key`.
///
/// An absent key and a value that fails to decode both read as `None`.
pub fn load<T, S>(store: &S, key: &str) -> Option<T>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let raw = store.get(key)?;
    serde_json::from_str(&raw).ok()
}

/// Raw elements of a collection record.
///
/// Only an absent key, text that is not JSON, or JSON that is not an array
/// reads as empty; elements are returned whatever their shape.
pub fn load_values<S>(store: &S, key: &str) -> Vec<Value>
where
    S: KeyValueStore + ?Sized,
{
    match load::<Value, S>(store, key) {
        Some(Value::Array(values)) => values,
        _ => Vec::new(),
    }
}

/// Decode each element of a collection record, skipping elements that do
/// not fit `T`
pub fn decode_each<T: DeserializeOwned>(values: &[Value]) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| serde_json::from_value(value.clone()).ok())
        .collect()
}

/// Read a collection record, keeping the elements that decode as `T`
pub fn load_list<T, S>(store: &S, key: &str) -> Vec<T>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    decode_each(&load_values(store, key))
}

/// Encode `value` and write it under `key`, replacing whatever was there
pub fn save<T, S>(store: &mut S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_load_absent_is_none() {
        let store = MemoryStore::new();
        assert!(load::<Vec<u32>, _>(&store, "numbers").is_none());
        assert!(load_list::<u32, _>(&store, "numbers").is_empty());
    }

    #[test]
    fn test_load_corrupt_is_none() {
        let mut store = MemoryStore::new();
        store.set("numbers", "[1, 2,").unwrap();
        assert!(load::<Vec<u32>, _>(&store, "numbers").is_none());
        assert!(load_list::<u32, _>(&store, "numbers").is_empty());
    }

    #[test]
    fn test_load_list_skips_misshapen_elements() {
        let mut store = MemoryStore::new();
        store.set("numbers", r#"[1, "two", 3, null, {"n": 4}]"#).unwrap();

        assert_eq!(load_list::<u32, _>(&store, "numbers"), vec![1, 3]);
        // The raw view keeps every element
        assert_eq!(load_values(&store, "numbers").len(), 5);
    }

    #[test]
    fn test_load_values_non_array_is_empty() {
        let mut store = MemoryStore::new();
        store.set("numbers", r#"{"not": "a list"}"#).unwrap();
        assert!(load_values(&store, "numbers").is_empty());
        assert!(load_list::<u32, _>(&store, "numbers").is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let mut store = MemoryStore::new();
        save(&mut store, "numbers", &[3u32, 1, 2]).unwrap();
        assert_eq!(store.get("numbers").as_deref(), Some("[3,1,2]"));
        assert_eq!(load_list::<u32, _>(&store, "numbers"), vec![3, 1, 2]);
    }
}
