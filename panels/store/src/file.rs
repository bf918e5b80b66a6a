//! JSON file backend
//!
//! Every call loads the whole file, applies the change and writes it back, so
//! writes from other processes show up on the next read.

use crate::app_name::AppName;
use crate::{PersistentStore, StoreError, check_quota};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Store backed by a single pretty-printed JSON object of strings
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
    quota: Option<usize>,
}

impl FileStore {
    /// Store for `origin` under the application's config directory
    pub fn for_origin(app_name: &AppName, origin: &str) -> Self {
        Self::at(app_name.origin_path(origin))
    }

    /// Store at an explicit file path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quota: None,
        }
    }

    /// Reject writes once keys and values together exceed `bytes`
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file; a missing or empty file is an empty store.
    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    action: "read",
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Write to a uniquely named temp file next to the store, then move it
    /// over the real one. Readers see either the old or the new file.
    fn save(&self, data: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_error("create", dir))?;

        let contents = serde_json::to_string_pretty(data).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_error("create temp file in", dir))?;
        tmp.write_all(contents.as_bytes())
            .map_err(io_error("write", tmp.path()))?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io {
            action: "replace",
            path: self.path.clone(),
            source: e.error,
        })?;

        Ok(())
    }

    /// Load, apply `modifier`, and save only if it reports a change.
    fn modify<F>(&self, modifier: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> Result<bool, StoreError>,
    {
        let mut data = self.load()?;
        let modified = modifier(&mut data)?;

        if modified {
            self.save(&data)?;
        }

        Ok(modified)
    }
}

fn io_error(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + use<> {
    let path = path.to_path_buf();
    move |source| StoreError::Io {
        action,
        path,
        source,
    }
}

impl PersistentStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        tracing::debug!(path = %self.path.display(), key, "file store get");
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        tracing::debug!(path = %self.path.display(), key, "file store set");
        self.modify(|data| {
            check_quota(data, key, value, self.quota)?;
            data.insert(key.to_string(), value.to_string());
            Ok(true)
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        tracing::debug!(path = %self.path.display(), key, "file store remove");
        self.modify(|data| Ok(data.remove(key).is_some()))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        tracing::debug!(path = %self.path.display(), "file store clear");
        self.modify(|data| {
            let had_entries = !data.is_empty();
            data.clear();
            Ok(had_entries)
        })?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.load()?.into_keys().collect())
    }

    fn entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        tracing::debug!(path = %self.path.display(), "file store entries");
        self.load()
    }
}
