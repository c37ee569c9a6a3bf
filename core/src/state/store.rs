//! Durable execution state: one JSON file, replaced atomically.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::transitions::StatusTransition;
use super::types::{ItemStatus, StatusCounts};
use crate::error::StateError;

fn default_attempt() -> u32 {
    1
}

/// Progress record for a run. The orchestrator is its only writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    /// Next wave to execute in the current plan.
    pub wave_index: usize,

    #[serde(rename = "items", default)]
    pub item_status: BTreeMap<String, ItemStatus>,

    /// Human-readable explanation attached to an item's last transition:
    /// why it failed, timed out or was skipped, or a note on how it completed.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reasons: BTreeMap<String, String>,

    #[serde(default = "default_attempt")]
    pub attempt: u32,

    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionState {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            wave_index: 0,
            item_status: BTreeMap::new(),
            reasons: BTreeMap::new(),
            attempt: 1,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self, item_id: &str) -> Option<ItemStatus> {
        self.item_status.get(item_id).copied()
    }

    pub fn reason(&self, item_id: &str) -> Option<&str> {
        self.reasons.get(item_id).map(String::as_str)
    }

    /// Track `item_id` as pending unless it already has a status.
    pub fn register(&mut self, item_id: &str) {
        self.item_status
            .entry(item_id.to_string())
            .or_insert(ItemStatus::Pending);
    }

    /// Move an item forward; unknown ids start from `pending`.
    pub fn set_status(&mut self, item_id: &str, to: ItemStatus) -> Result<(), StateError> {
        let from = self.status(item_id).unwrap_or(ItemStatus::Pending);
        StatusTransition::validate(item_id, from, to)?;
        self.item_status.insert(item_id.to_string(), to);
        self.touch();
        Ok(())
    }

    pub fn set_status_with_reason(
        &mut self,
        item_id: &str,
        to: ItemStatus,
        reason: impl Into<String>,
    ) -> Result<(), StateError> {
        self.set_status(item_id, to)?;
        self.reasons.insert(item_id.to_string(), reason.into());
        Ok(())
    }

    pub fn completed_ids(&self) -> HashSet<String> {
        self.ids_with(ItemStatus::Completed).into_iter().collect()
    }

    pub fn ids_with(&self, status: ItemStatus) -> Vec<String> {
        self.item_status
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn counts(&self) -> StatusCounts {
        self.item_status.values().copied().collect()
    }

    /// Start a new attempt: everything not completed goes back to `pending`
    /// and a fresh plan begins at wave 0.
    pub fn begin_attempt(&mut self) {
        self.attempt += 1;
        self.wave_index = 0;
        for (id, status) in self.item_status.iter_mut() {
            if *status != ItemStatus::Completed {
                *status = ItemStatus::Pending;
                self.reasons.remove(id);
            }
        }
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Reads and atomically replaces the execution-state file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state.json".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    /// Write to a sibling temp file, fsync, then rename over the target.
    ///
    /// On any failure the previously persisted file is left untouched.
    pub fn save(&self, state: &ExecutionState) -> Result<(), StateError> {
        let json = serde_json::to_vec_pretty(state)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StateError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp = self.temp_path();
        let write_tmp = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
            Ok(())
        };

        if let Err(source) = write_tmp() {
            let _ = fs::remove_file(&tmp);
            return Err(StateError::Write { path: tmp, source });
        }

        fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            StateError::Write {
                path: self.path.clone(),
                source,
            }
        })?;

        tracing::debug!(
            path = %self.path.display(),
            wave_index = state.wave_index,
            "Execution state saved"
        );
        Ok(())
    }

    /// `Ok(None)` when no state has been persisted yet.
    pub fn load(&self) -> Result<Option<ExecutionState>, StateError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StateError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// State to continue from: the persisted state in a new attempt, or a
    /// fresh state when nothing was persisted.
    pub fn resume(&self) -> Result<ExecutionState, StateError> {
        match self.load()? {
            Some(mut state) => {
                state.begin_attempt();
                tracing::info!(
                    path = %self.path.display(),
                    attempt = state.attempt,
                    completed = state.counts().completed,
                    "Resuming from persisted state"
                );
                Ok(state)
            }
            None => Ok(ExecutionState::new()),
        }
    }
}
