use std::path::PathBuf;

use thiserror::Error;

use crate::state::ItemStatus;

/// Execution-state persistence and state-machine errors.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("state file {path} is not valid: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize execution state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid status transition for '{item_id}': {from} -> {to}")]
    InvalidTransition {
        item_id: String,
        from: ItemStatus,
        to: ItemStatus,
    },
}
