//! The key/value panel itself, independent of any UI toolkit.

use keystash::Notifier;
use keystash_store::{PersistentStore, StoreError};
use thiserror::Error;

use crate::snapshot::Snapshot;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("validation failed: {0}")]
    Validation(&'static str),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl PanelError {
    /// Text shown to the user for this failure
    pub fn user_message(&self) -> String {
        match self {
            PanelError::Validation(_) => "Please enter a key".to_string(),
            PanelError::StoreUnavailable(e) => format!("Storage unavailable: {e}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
}

/// Edits and lists the entries of one [`PersistentStore`].
///
/// Every mutation is followed by a full reload of the [`Snapshot`] and
/// reports exactly one notification. A failed operation leaves the snapshot
/// as it was.
#[derive(Debug)]
pub struct KeyValuePanel<S> {
    store: S,
    pending_key: String,
    pending_value: String,
    snapshot: Snapshot,
    phase: Phase,
}

impl<S: PersistentStore> KeyValuePanel<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            pending_key: String::new(),
            pending_value: String::new(),
            snapshot: Snapshot::default(),
            phase: Phase::Loading,
        }
    }

    /// Load the snapshot. The panel is `Ready` afterwards even if the store
    /// could not be read; only failures are reported.
    pub fn activate(&mut self, notifier: &mut impl Notifier) -> Result<(), PanelError> {
        let result = self.reload();
        self.phase = Phase::Ready;

        match result {
            Ok(()) => {
                tracing::info!(entries = self.snapshot.len(), "key/value panel ready");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "initial load failed");
                notifier.notify_error(e.user_message());
                Err(e)
            }
        }
    }

    /// Store `value` under `key`, overwriting any previous value.
    ///
    /// `key` must contain something other than whitespace; it is stored as
    /// given. Clears the pending inputs on success.
    pub fn save(
        &mut self,
        key: &str,
        value: &str,
        notifier: &mut impl Notifier,
    ) -> Result<(), PanelError> {
        let result = self.try_save(key, value);
        if result.is_ok() {
            self.pending_key.clear();
            self.pending_value.clear();
        }
        report(result, || format!("Saved \"{key}\""), notifier)
    }

    /// Save the pending inputs
    pub fn submit(&mut self, notifier: &mut impl Notifier) -> Result<(), PanelError> {
        let key = self.pending_key.clone();
        let value = self.pending_value.clone();
        self.save(&key, &value, notifier)
    }

    /// Remove `key`. Absent keys are fine and still reported as deleted.
    pub fn delete(&mut self, key: &str, notifier: &mut impl Notifier) -> Result<(), PanelError> {
        let result = self
            .store
            .remove(key)
            .map_err(PanelError::from)
            .and_then(|()| self.reload());
        if result.is_ok() {
            tracing::info!(key, "entry deleted");
        }
        report(result, || format!("Deleted \"{key}\""), notifier)
    }

    /// Remove every entry.
    pub fn clear_all(&mut self, notifier: &mut impl Notifier) -> Result<(), PanelError> {
        let result = self
            .store
            .clear()
            .map_err(PanelError::from)
            .and_then(|()| self.reload());
        if result.is_ok() {
            tracing::info!("all entries cleared");
        }
        report(result, || "Cleared all entries".to_string(), notifier)
    }

    pub fn set_pending_key(&mut self, key: impl Into<String>) {
        self.pending_key = key.into();
    }

    pub fn set_pending_value(&mut self, value: impl Into<String>) {
        self.pending_value = value.into();
    }

    fn try_save(&mut self, key: &str, value: &str) -> Result<(), PanelError> {
        if key.trim().is_empty() {
            return Err(PanelError::Validation("empty key"));
        }
        self.store.set(key, value)?;
        self.reload()?;
        tracing::info!(key, bytes = value.len(), "entry saved");
        Ok(())
    }

    /// Replace the snapshot only once the whole store has been read.
    fn reload(&mut self) -> Result<(), PanelError> {
        self.snapshot = Snapshot::load(&self.store)?;
        Ok(())
    }
}

impl<S> KeyValuePanel<S> {
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Value of `key` as of the last reload
    pub fn get(&self, key: &str) -> Option<&str> {
        self.snapshot.get(key)
    }

    pub fn count(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    pub fn pending_key(&self) -> &str {
        &self.pending_key
    }

    pub fn pending_value(&self) -> &str {
        &self.pending_value
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

fn report(
    result: Result<(), PanelError>,
    success: impl FnOnce() -> String,
    notifier: &mut impl Notifier,
) -> Result<(), PanelError> {
    match &result {
        Ok(()) => notifier.notify_success(success()),
        Err(e) => {
            tracing::warn!(error = %e, "key/value operation failed");
            notifier.notify_error(e.user_message());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystash::{Level, Notification};
    use keystash_store::MemoryStore;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn ready_panel() -> (KeyValuePanel<MemoryStore>, Vec<Notification>) {
        let mut panel = KeyValuePanel::new(MemoryStore::new());
        let mut log = Vec::new();
        panel.activate(&mut log).unwrap();
        (panel, log)
    }

    fn snapshot(pairs: &[(&str, &str)]) -> Snapshot {
        pairs.iter().copied().collect()
    }

    /// Fails every call, like storage that has been disabled
    struct Unavailable;

    impl PersistentStore for Unavailable {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
        fn clear(&self) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
        fn keys(&self) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    /// Writes go through, but listing fails once `broken` is set
    #[derive(Default)]
    struct ListingFails {
        inner: MemoryStore,
        broken: AtomicBool,
    }

    impl ListingFails {
        fn check(&self) -> Result<(), StoreError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(StoreError::Poisoned);
            }
            Ok(())
        }
    }

    impl PersistentStore for ListingFails {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
        fn clear(&self) -> Result<(), StoreError> {
            self.inner.clear()
        }
        fn keys(&self) -> Result<Vec<String>, StoreError> {
            self.check()?;
            self.inner.keys()
        }
        fn entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
            self.check()?;
            self.inner.entries()
        }
    }

    #[test]
    fn activation_moves_from_loading_to_ready() {
        let store = MemoryStore::new();
        store.set("existing", "1").unwrap();
        let mut panel = KeyValuePanel::new(store);
        assert_eq!(panel.phase(), Phase::Loading);
        assert!(panel.is_empty());

        let mut log = Vec::new();
        panel.activate(&mut log).unwrap();

        assert_eq!(panel.phase(), Phase::Ready);
        assert_eq!(panel.snapshot(), &snapshot(&[("existing", "1")]));
        assert!(log.is_empty());
    }

    #[test]
    fn saved_value_reads_back_exactly() {
        let (mut panel, mut log) = ready_panel();
        for (key, value) in [("k", "v"), ("space key", "  padded  "), ("ünï", ""), ("json", "{\"a\":1}")] {
            panel.save(key, value, &mut log).unwrap();
            assert_eq!(panel.get(key), Some(value));
        }
    }

    #[test]
    fn overwrite_keeps_a_single_entry() {
        let (mut panel, mut log) = ready_panel();
        panel.save("k", "a", &mut log).unwrap();
        panel.save("k", "b", &mut log).unwrap();
        assert_eq!(panel.get("k"), Some("b"));
        assert_eq!(panel.count(), 1);
    }

    #[test]
    fn deleting_a_missing_key_changes_nothing_but_still_notifies() {
        let (mut panel, mut log) = ready_panel();
        panel.save("a", "1", &mut log).unwrap();
        panel.save("b", "2", &mut log).unwrap();
        let before = panel.snapshot().clone();
        log.clear();

        panel.delete("missing", &mut log).unwrap();

        assert_eq!(panel.snapshot(), &before);
        assert_eq!(log, vec![Notification::success("Deleted \"missing\"")]);
    }

    #[test]
    fn clear_all_empties_the_snapshot() {
        let (mut panel, mut log) = ready_panel();
        for i in 0..5 {
            panel.save(&format!("k{i}"), "v", &mut log).unwrap();
        }
        log.clear();

        panel.clear_all(&mut log).unwrap();

        assert_eq!(panel.count(), 0);
        assert_eq!(log, vec![Notification::success("Cleared all entries")]);
    }

    #[test]
    fn blank_keys_are_rejected() {
        let (mut panel, mut log) = ready_panel();
        panel.save("keep", "me", &mut log).unwrap();
        let before = panel.snapshot().clone();

        for key in ["", "   ", "\t\n"] {
            log.clear();
            let err = panel.save(key, "anything", &mut log).unwrap_err();
            assert!(matches!(err, PanelError::Validation("empty key")));
            assert_eq!(panel.snapshot(), &before);
            assert_eq!(log, vec![Notification::error("Please enter a key")]);
        }
    }

    #[test]
    fn scenario_single_save() {
        let (mut panel, mut log) = ready_panel();
        panel.save("username", "alice", &mut log).unwrap();

        assert_eq!(panel.snapshot(), &snapshot(&[("username", "alice")]));
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].level, Level::Success);
        assert!(log[0].message.contains("username"));
    }

    #[test]
    fn scenario_save_two_delete_one() {
        let (mut panel, mut log) = ready_panel();
        panel.save("a", "1", &mut log).unwrap();
        panel.save("b", "2", &mut log).unwrap();
        panel.delete("a", &mut log).unwrap();
        assert_eq!(panel.snapshot(), &snapshot(&[("b", "2")]));
    }

    #[test]
    fn scenario_save_then_clear() {
        let (mut panel, mut log) = ready_panel();
        panel.save("x", "1", &mut log).unwrap();
        panel.clear_all(&mut log).unwrap();
        assert_eq!(panel.snapshot(), &Snapshot::default());
    }

    #[test]
    fn scenario_empty_key_creates_nothing() {
        let (mut panel, mut log) = ready_panel();
        assert!(panel.save("", "value", &mut log).is_err());
        assert!(panel.is_empty());
        assert!(panel.store().keys().unwrap().is_empty());
        assert_eq!(log, vec![Notification::error("Please enter a key")]);
    }

    #[test]
    fn keys_are_stored_untrimmed() {
        let (mut panel, mut log) = ready_panel();
        panel.save(" padded ", "v", &mut log).unwrap();
        assert_eq!(panel.get(" padded "), Some("v"));
        assert_eq!(panel.get("padded"), None);
    }

    #[test]
    fn submit_saves_and_resets_pending_inputs() {
        let (mut panel, mut log) = ready_panel();
        panel.set_pending_key("theme");
        panel.set_pending_value("dark");

        panel.submit(&mut log).unwrap();

        assert_eq!(panel.get("theme"), Some("dark"));
        assert_eq!(panel.pending_key(), "");
        assert_eq!(panel.pending_value(), "");
    }

    #[test]
    fn failed_submit_keeps_pending_inputs() {
        let (mut panel, mut log) = ready_panel();
        panel.set_pending_key("  ");
        panel.set_pending_value("draft");

        assert!(panel.submit(&mut log).is_err());

        assert_eq!(panel.pending_key(), "  ");
        assert_eq!(panel.pending_value(), "draft");
    }

    #[test]
    fn external_writes_show_up_on_next_reload_only() {
        let store = MemoryStore::new();
        let outside = store.clone();
        let mut panel = KeyValuePanel::new(store);
        let mut log = Vec::new();
        panel.activate(&mut log).unwrap();

        outside.set("elsewhere", "1").unwrap();
        assert_eq!(panel.get("elsewhere"), None);

        panel.save("mine", "2", &mut log).unwrap();
        assert_eq!(panel.snapshot(), &snapshot(&[("elsewhere", "1"), ("mine", "2")]));

        outside.remove("mine").unwrap();
        panel.activate(&mut log).unwrap();
        assert_eq!(panel.snapshot(), &snapshot(&[("elsewhere", "1")]));
        assert_eq!(panel.phase(), Phase::Ready);
    }

    #[test]
    fn quota_failure_leaves_snapshot_unchanged() {
        let mut panel = KeyValuePanel::new(MemoryStore::new().with_quota(6));
        let mut log = Vec::new();
        panel.activate(&mut log).unwrap();
        panel.save("ab", "cd", &mut log).unwrap();
        let before = panel.snapshot().clone();
        log.clear();

        let err = panel.save("big", "value", &mut log).unwrap_err();

        assert!(matches!(
            err,
            PanelError::StoreUnavailable(StoreError::QuotaExceeded { .. })
        ));
        assert_eq!(panel.snapshot(), &before);
        assert_eq!(log.len(), 1);
        assert!(log[0].is_error());
        assert!(log[0].message.starts_with("Storage unavailable"));
    }

    #[test]
    fn unavailable_store_fails_every_operation_once() {
        let mut panel = KeyValuePanel::new(Unavailable);
        let mut log = Vec::new();

        assert!(panel.activate(&mut log).is_err());
        assert_eq!(panel.phase(), Phase::Ready);
        assert!(panel.save("k", "v", &mut log).is_err());
        assert!(panel.delete("k", &mut log).is_err());
        assert!(panel.clear_all(&mut log).is_err());

        assert_eq!(log.len(), 4);
        assert!(log.iter().all(Notification::is_error));
        assert!(panel.is_empty());
    }

    #[test]
    fn failed_reload_after_a_write_keeps_the_old_snapshot() {
        let mut panel = KeyValuePanel::new(ListingFails::default());
        let mut log = Vec::new();
        panel.activate(&mut log).unwrap();
        panel.save("a", "1", &mut log).unwrap();
        panel.save("b", "2", &mut log).unwrap();
        let before = panel.snapshot().clone();
        panel.store().broken.store(true, Ordering::SeqCst);

        panel.set_pending_key("c");
        panel.set_pending_value("3");
        log.clear();
        let err = panel.submit(&mut log).unwrap_err();
        assert!(matches!(err, PanelError::StoreUnavailable(StoreError::Poisoned)));
        assert_eq!(panel.snapshot(), &before);
        assert_eq!((panel.pending_key(), panel.pending_value()), ("c", "3"));
        assert_eq!(log.len(), 1);
        assert!(log[0].is_error());

        log.clear();
        assert!(panel.delete("a", &mut log).is_err());
        assert_eq!(panel.snapshot(), &before);
        assert_eq!(log.len(), 1);
        assert!(log[0].is_error());

        log.clear();
        assert!(panel.clear_all(&mut log).is_err());
        assert_eq!(panel.snapshot(), &before);
        assert_eq!(log.len(), 1);
        assert!(log[0].is_error());

        // The writes themselves landed; the next good reload shows them
        panel.store().broken.store(false, Ordering::SeqCst);
        panel.activate(&mut log).unwrap();
        assert!(panel.is_empty());
    }
}
