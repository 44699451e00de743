use serde_json::Value;
use std::collections::btree_map::{self, BTreeMap};

/// A partial state update, applied to a store by shallow merge.
///
/// Every key in the patch overwrites the store's value for that key; keys not
/// named in the patch are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    entries: BTreeMap<String, Value>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A patch that writes a single key.
    pub fn single(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut patch = Self::new();
        patch.insert(key, value);
        patch
    }

    /// Add or replace one key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Combine two patches; keys in `other` win.
    pub fn merge(mut self, other: StatePatch) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }
}

impl IntoIterator for StatePatch {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for StatePatch {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl From<StatePatch> for Value {
    fn from(patch: StatePatch) -> Self {
        Value::Object(patch.entries.into_iter().collect())
    }
}
