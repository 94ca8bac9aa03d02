//! Insertion-ordered multimaps for map-like debugger values.
//!
//! [`OrderedMultiMap`] keeps every `(key, value)` pair in insertion order and
//! indexes them three ways: by key, by position (negative positions count
//! from the end), and by a case-insensitive *derived string key* (see
//! [`MapKey`]). [`OrderedMap`] is the unique-key member of the family.
//!
//! ```rust
//! use colview::collections::OrderedMultiMap;
//! use colview::Value;
//!
//! let mut env = OrderedMultiMap::new();
//! env.insert(Value::from("PATH"), Value::from("/bin")).unwrap();
//! env.insert(Value::from("PATH"), Value::from("/usr/bin")).unwrap();
//! env.insert(Value::from("HOME"), Value::from("/root")).unwrap();
//!
//! assert_eq!(env.get_all(&Value::from("PATH")).len(), 2);
//! assert_eq!(env.get_index(-1).map(|(k, _)| k), Some(&Value::from("HOME")));
//! assert_eq!(env.get_by_string_key("home").len(), 1);
//!
//! env.freeze();
//! assert!(env.insert(Value::from("X"), Value::Null).is_err());
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{FormatError, FrozenMutationError, Result};
use crate::value::Value;

/// Keys usable in the ordered multimaps.
pub trait MapKey: Hash + Eq + Clone {
    /// String form used by the case-insensitive string index.
    fn string_key(&self) -> String;
}

impl MapKey for String {
    fn string_key(&self) -> String {
        self.clone()
    }
}

impl MapKey for Value {
    /// Single-line rendering, with surrounding quotes stripped for text.
    fn string_key(&self) -> String {
        let rendered = self.to_single_line();
        if !self.is_textual() {
            return rendered;
        }
        strip_quotes(&rendered).to_string()
    }
}

fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

fn fold(key: &str) -> String {
    key.to_lowercase()
}

/// Append-only (until frozen) multimap preserving insertion order.
#[derive(Debug, Clone)]
pub struct OrderedMultiMap<K, V> {
    entries: Vec<(K, V)>,
    by_key: HashMap<K, Vec<usize>>,
    by_string: HashMap<String, Vec<usize>>,
    frozen: bool,
}

impl<K: MapKey, V> Default for OrderedMultiMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: MapKey, V> OrderedMultiMap<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            by_key: HashMap::new(),
            by_string: HashMap::new(),
            frozen: false,
        }
    }

    /// Number of pairs (not distinct keys).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Blocks further insertion.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Appends a pair.
    pub fn insert(&mut self, key: K, value: V) -> std::result::Result<(), FrozenMutationError> {
        if self.frozen {
            return Err(FrozenMutationError::new("multimap"));
        }
        let position = self.entries.len();
        self.by_string
            .entry(fold(&key.string_key()))
            .or_default()
            .push(position);
        self.by_key.entry(key.clone()).or_default().push(position);
        self.entries.push((key, value));
        Ok(())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    /// All values stored under `key`, in insertion order.
    pub fn get_all(&self, key: &K) -> Vec<&V> {
        self.positions(self.by_key.get(key))
            .map(|(_, v)| v)
            .collect()
    }

    /// The first value stored under `key`.
    pub fn get_first(&self, key: &K) -> Option<&V> {
        self.by_key
            .get(key)
            .and_then(|positions| positions.first())
            .map(|&i| &self.entries[i].1)
    }

    /// Pair at `index`; negative indices count from the end (`-1` is last).
    pub fn get_index(&self, index: isize) -> Option<(&K, &V)> {
        let resolved = if index < 0 {
            self.entries.len().checked_sub(index.unsigned_abs())?
        } else {
            usize::try_from(index).ok()?
        };
        self.entries.get(resolved).map(|(k, v)| (k, v))
    }

    /// Pairs whose derived string key matches, ignoring case.
    pub fn get_by_string_key(&self, key: &str) -> Vec<(&K, &V)> {
        self.positions(self.by_string.get(&fold(key))).collect()
    }

    fn positions<'a>(
        &'a self,
        positions: Option<&'a Vec<usize>>,
    ) -> impl Iterator<Item = (&'a K, &'a V)> + 'a {
        positions
            .into_iter()
            .flatten()
            .map(move |&i| (&self.entries[i].0, &self.entries[i].1))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

/// Unique-key ordered map built on [`OrderedMultiMap`].
#[derive(Debug, Clone)]
pub struct OrderedMap<K, V> {
    inner: OrderedMultiMap<K, V>,
}

impl<K: MapKey, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            inner: OrderedMultiMap::new(),
        }
    }
}

impl<K: MapKey + std::fmt::Debug, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new key; a duplicate key is a configuration error.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        if self.inner.contains_key(&key) {
            return Err(FormatError::Configuration(format!(
                "duplicate key {:?}",
                key
            )));
        }
        Ok(self.inner.insert(key, value)?)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get_first(key)
    }

    pub fn get_index(&self, index: isize) -> Option<(&K, &V)> {
        self.inner.get_index(index)
    }

    /// The value whose derived string key matches, ignoring case.
    ///
    /// Distinct keys can share a string form (`1` and `"1"`); the first
    /// inserted wins.
    pub fn get_by_string_key(&self, key: &str) -> Option<&V> {
        self.inner.get_by_string_key(key).first().map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn freeze(&mut self) {
        self.inner.freeze();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter()
    }

    /// The underlying multimap view.
    pub fn as_multimap(&self) -> &OrderedMultiMap<K, V> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OrderedMultiMap<Value, Value> {
        let mut map = OrderedMultiMap::new();
        map.insert("a".into(), 1i32.into()).unwrap();
        map.insert(2u8.into(), "two".into()).unwrap();
        map.insert("A".into(), 3i32.into()).unwrap();
        map.insert("a".into(), 4i32.into()).unwrap();
        map
    }

    #[test]
    fn test_insertion_order_preserved() {
        let map = sample();
        let keys: Vec<String> = map.keys().map(|k| k.string_key()).collect();
        assert_eq!(keys, vec!["a", "2", "A", "a"]);
        assert_eq!(map.len(), 4);
        assert_eq!(map.key_count(), 3);
    }

    #[test]
    fn test_lookup_by_key() {
        let map = sample();
        assert_eq!(
            map.get_all(&"a".into()),
            vec![&Value::I32(1), &Value::I32(4)]
        );
        assert_eq!(map.get_first(&2u8.into()), Some(&Value::from("two")));
        assert!(map.get_all(&"missing".into()).is_empty());
    }

    #[test]
    fn test_integer_keys_match_across_widths() {
        let map = sample();
        assert_eq!(map.get_first(&Value::I64(2)), Some(&Value::from("two")));
    }

    #[test]
    fn test_lookup_by_position() {
        let map = sample();
        assert_eq!(map.get_index(0).map(|(_, v)| v), Some(&Value::I32(1)));
        assert_eq!(map.get_index(-1).map(|(_, v)| v), Some(&Value::I32(4)));
        assert_eq!(map.get_index(-4).map(|(_, v)| v), Some(&Value::I32(1)));
        assert!(map.get_index(4).is_none());
        assert!(map.get_index(-5).is_none());
    }

    #[test]
    fn test_lookup_by_string_key_ignores_case_and_quotes() {
        let map = sample();
        let hits = map.get_by_string_key("A");
        assert_eq!(hits.len(), 3);
        assert_eq!(map.get_by_string_key("2").len(), 1);
        assert!(map.get_by_string_key("\"a\"").is_empty());
    }

    #[test]
    fn test_freeze_blocks_insert() {
        let mut map = sample();
        map.freeze();
        assert!(map.is_frozen());
        assert!(map.insert("b".into(), Value::Null).is_err());
        assert_eq!(map.len(), 4);
        assert_eq!(map.get_index(-1).map(|(_, v)| v), Some(&Value::I32(4)));
    }

    #[test]
    fn test_ordered_map_rejects_duplicates() {
        let mut map: OrderedMap<String, i32> = OrderedMap::new();
        map.insert("x".into(), 1).unwrap();
        let err = map.insert("x".into(), 2).unwrap_err();
        assert!(matches!(err, FormatError::Configuration(_)));
        assert_eq!(map.get(&"x".into()), Some(&1));
        assert_eq!(map.get_by_string_key("X"), Some(&1));
    }

    #[test]
    fn test_ordered_map_frozen_insert_fails() {
        let mut map: OrderedMap<String, i32> = OrderedMap::new();
        map.freeze();
        let err = map.insert("x".into(), 1).unwrap_err();
        assert!(matches!(err, FormatError::FrozenMutation(_)));
    }
}
