use std::path::PathBuf;
use thiserror::Error;

/// Reasons the persistent store cannot serve a request
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {} is not a string map: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("quota of {limit} bytes exceeded ({required} bytes needed)")]
    QuotaExceeded { limit: usize, required: usize },

    #[error("store lock poisoned")]
    Poisoned,
}
