//! Persistent key/value storage for keystash
//!
//! [`PersistentStore`] is the whole contract the key/value panel relies on:
//! get, set, remove, clear and enumerate. Two backends implement it.
//!
//! - [`MemoryStore`]: a shared in-memory map, for tests and throwaway sessions
//! - [`FileStore`]: one JSON file per origin under the platform config dir
//!
//! # Example
//!
//! ```
//! use keystash_store::{MemoryStore, PersistentStore};
//!
//! let store = MemoryStore::new();
//! store.set("username", "alice").unwrap();
//! assert_eq!(store.get("username").unwrap().as_deref(), Some("alice"));
//! ```

mod app_name;
mod error;
mod file;
mod memory;

pub use app_name::AppName;
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::sync::Arc;

/// Origin-scoped string key/value storage.
///
/// Implementations serialize their own operations; callers never lock.
pub trait PersistentStore {
    /// Read one value, `None` if the key is absent
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite one value
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove one value; absent keys are not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Remove every value
    fn clear(&self) -> Result<(), StoreError>;

    /// Every stored key, in no particular order
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Every stored entry at once.
    ///
    /// The default enumerates [`keys`](Self::keys) and reads each one, leaving
    /// out keys that vanish in between. Backends that can read everything in
    /// one go should override it.
    fn entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let mut entries = BTreeMap::new();
        for key in self.keys()? {
            if let Some(value) = self.get(&key)? {
                entries.insert(key, value);
            }
        }
        Ok(entries)
    }
}

impl<T: PersistentStore + ?Sized> PersistentStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys()
    }

    fn entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        (**self).entries()
    }
}

/// A store handle that can be shared across panels and threads
pub type SharedStore = Arc<dyn PersistentStore + Send + Sync>;

/// Bytes an entry map occupies, counting key and value lengths
pub(crate) fn usage_bytes(data: &BTreeMap<String, String>) -> usize {
    data.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// Fail with [`StoreError::QuotaExceeded`] if writing `key = value` would push
/// `data` past `quota` bytes.
pub(crate) fn check_quota(
    data: &BTreeMap<String, String>,
    key: &str,
    value: &str,
    quota: Option<usize>,
) -> Result<(), StoreError> {
    let Some(limit) = quota else {
        return Ok(());
    };

    let replaced = data.get(key).map_or(0, |old| key.len() + old.len());
    let required = usage_bytes(data) - replaced + key.len() + value.len();

    if required > limit {
        return Err(StoreError::QuotaExceeded { limit, required });
    }
    Ok(())
}
