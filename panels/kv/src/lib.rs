//! Key/value panel for keystash
//!
//! Lists every entry of a [`PersistentStore`](keystash_store::PersistentStore)
//! and lets the user save, delete and clear them. [`KeyValuePanel`] holds the
//! logic and works with any store and any [`Notifier`](keystash::Notifier);
//! [`KvPanelPlugin`] hosts it in a [`PanelHost`](keystash::PanelHost) and
//! emits each operation's notification as the panel output.

mod panel;
mod plugin;
mod snapshot;

pub use panel::{KeyValuePanel, PanelError, Phase};
pub use plugin::{KvMessage, KvPanelPlugin};
pub use snapshot::{Entry, Snapshot};
