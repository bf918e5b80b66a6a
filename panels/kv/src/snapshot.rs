use std::collections::BTreeMap;

use keystash_store::{PersistentStore, StoreError};

/// One stored key/value pair
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

/// Point-in-time copy of every entry in a store, sorted by key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<Entry>,
}

impl Snapshot {
    /// Read the whole store in one call.
    pub fn load<S: PersistentStore + ?Sized>(store: &S) -> Result<Self, StoreError> {
        Ok(store.entries()?.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .binary_search_by(|entry| entry.key.as_str().cmp(key))
            .ok()
            .map(|i| self.entries[i].value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending key order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

impl From<BTreeMap<String, String>> for Snapshot {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self {
            entries: map
                .into_iter()
                .map(|(key, value)| Entry { key, value })
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<BTreeMap<_, _>>()
            .into()
    }
}
