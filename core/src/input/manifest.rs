//! Work item manifest: the JSON hand-off from whatever discovers issues.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CliError;
use crate::graph::WorkItem;

lazy_static! {
    /// `BUG-042-fix-login` → `BUG-042`
    static ref ISSUE_ID_RE: Regex = Regex::new(r"^([A-Za-z][A-Za-z0-9]*-\d+)").unwrap();
}

/// `{ "items": [...], "completed": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemManifest {
    #[serde(default)]
    pub items: Vec<WorkItem>,

    /// Ids finished before this manifest was written.
    #[serde(default)]
    pub completed: Vec<String>,
}

impl ItemManifest {
    pub fn from_json(json: &str) -> Result<Self, CliError> {
        serde_json::from_str(json).map_err(|e| CliError::Input(format!("invalid manifest: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, CliError> {
        let json = fs::read_to_string(path).map_err(|e| {
            CliError::Input(format!("cannot read manifest {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Every id referenced anywhere in the manifest.
    fn known_ids(&self) -> HashSet<&str> {
        let mut ids: HashSet<&str> = HashSet::new();
        for item in &self.items {
            ids.insert(&item.id);
            ids.extend(item.blocked_by.iter().map(String::as_str));
            ids.extend(item.blocks.iter().map(String::as_str));
        }
        ids.extend(self.completed.iter().map(String::as_str));
        ids
    }

    /// The "already complete" predicate: the manifest's own list plus
    /// anything found in `archive_dir`.
    pub fn completed_ids(&self, archive_dir: Option<&Path>) -> Result<HashSet<String>, CliError> {
        let mut completed: HashSet<String> = self.completed.iter().cloned().collect();
        if let Some(dir) = archive_dir {
            completed.extend(archived_ids(dir, &self.known_ids())?);
        }
        Ok(completed)
    }
}

/// Ids of archived items, taken from file stems in `dir`.
///
/// A stem matches a known id when it equals it or continues with `-`; the
/// longest such id wins. Stems matching no known id fall back to a
/// `PREFIX-123` pattern. A missing directory yields nothing.
pub fn archived_ids(dir: &Path, known: &HashSet<&str>) -> Result<HashSet<String>, CliError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => return Err(CliError::Io(e)),
    };

    let mut ids = HashSet::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let matched = known
            .iter()
            .filter(|id| {
                stem == **id
                    || stem
                        .strip_prefix(**id)
                        .is_some_and(|rest| rest.starts_with('-'))
            })
            .max_by_key(|id| id.len())
            .map(|id| id.to_string())
            .or_else(|| ISSUE_ID_RE.captures(stem).map(|c| c[1].to_string()));

        if let Some(id) = matched {
            ids.insert(id);
        }
    }

    tracing::debug!(dir = %dir.display(), count = ids.len(), "Archived items found");
    Ok(ids)
}
