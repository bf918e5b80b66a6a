//! Hosting the key/value panel inside a [`PanelHost`](keystash::PanelHost)

use iced::{Subscription, Task};
use keystash::{Notification, Panel};
use keystash_store::PersistentStore;

use crate::panel::KeyValuePanel;

/// Messages the key/value panel handles
#[derive(Clone, Debug)]
pub enum KvMessage {
    /// Load the snapshot; sent once on startup
    Activate,
    KeyChanged(String),
    ValueChanged(String),
    /// Save the pending key and value
    Submit,
    Save { key: String, value: String },
    Delete(String),
    ClearAll,
}

impl KvMessage {
    pub fn save(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Save {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete(key.into())
    }
}

/// Key/value panel backed by `S`. Its output is the notification each
/// operation produces.
///
/// # Example
///
/// ```ignore
/// let mut builder = PanelHostBuilder::new();
/// let kv = builder.install(KvPanelPlugin::new(MemoryStore::new()));
/// let (panels, init_task) = builder.build();
///
/// let task = kv.dispatch(KvMessage::save("username", "alice"));
/// ```
#[derive(Clone, Debug)]
pub struct KvPanelPlugin<S> {
    store: S,
}

impl<S> KvPanelPlugin<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> Panel for KvPanelPlugin<S>
where
    S: PersistentStore + Clone + Send + Sync + 'static,
{
    type Message = KvMessage;
    type State = KeyValuePanel<S>;
    type Output = Notification;

    fn name(&self) -> &'static str {
        "kv"
    }

    fn init(&self) -> (Self::State, Task<Self::Message>) {
        (
            KeyValuePanel::new(self.store.clone()),
            Task::done(KvMessage::Activate),
        )
    }

    fn update(
        &self,
        state: &mut Self::State,
        message: Self::Message,
    ) -> (Task<Self::Message>, Option<Self::Output>) {
        let mut outcome: Option<Notification> = None;

        let result = match message {
            KvMessage::Activate => state.activate(&mut outcome),
            KvMessage::KeyChanged(key) => {
                state.set_pending_key(key);
                Ok(())
            }
            KvMessage::ValueChanged(value) => {
                state.set_pending_value(value);
                Ok(())
            }
            KvMessage::Submit => state.submit(&mut outcome),
            KvMessage::Save { key, value } => state.save(&key, &value, &mut outcome),
            KvMessage::Delete(key) => state.delete(&key, &mut outcome),
            KvMessage::ClearAll => state.clear_all(&mut outcome),
        };

        // The user already sees the failure through `outcome`
        if let Err(e) = result {
            tracing::debug!(error = %e, "kv message handled with an error");
        }

        (Task::none(), outcome)
    }

    fn subscription(&self, _state: &Self::State) -> Subscription<Self::Message> {
        Subscription::none()
    }
}
