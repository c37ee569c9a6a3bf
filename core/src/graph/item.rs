use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Scheduling priority. Lower levels are more urgent (`P0` before `P3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "PriorityRepr", into = "String")]
pub struct Priority(u8);

impl Priority {
    pub const MAX_LEVEL: u8 = 9;

    pub fn new(level: u8) -> Self {
        Self(level.min(Self::MAX_LEVEL))
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(3)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('P')
            .or_else(|| trimmed.strip_prefix('p'))
            .unwrap_or(trimmed);
        let level: u8 = digits
            .parse()
            .map_err(|_| format!("invalid priority '{s}' (expected P0..P9)"))?;
        if level > Self::MAX_LEVEL {
            return Err(format!("priority '{s}' out of range (expected P0..P9)"));
        }
        Ok(Self(level))
    }
}

impl From<Priority> for String {
    fn from(p: Priority) -> Self {
        p.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PriorityRepr {
    Level(u8),
    Label(String),
}

impl TryFrom<PriorityRepr> for Priority {
    type Error = String;

    fn try_from(repr: PriorityRepr) -> Result<Self, Self::Error> {
        match repr {
            PriorityRepr::Level(level) if level <= Self::MAX_LEVEL => Ok(Self(level)),
            PriorityRepr::Level(level) => Err(format!("priority {level} out of range")),
            PriorityRepr::Label(label) => label.parse(),
        }
    }
}

/// A schedulable unit of work (one issue).
///
/// Items are immutable for the duration of a run; status lives in
/// [`crate::state::ExecutionState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Ids that must complete before this item may start.
    #[serde(default)]
    pub blocked_by: BTreeSet<String>,

    /// Ids that cannot start until this item completes.
    #[serde(default)]
    pub blocks: BTreeSet<String>,

    /// Free-text body; scanned for file hints during contention analysis.
    #[serde(default)]
    pub description: String,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: id.into(),
            priority,
            title: None,
            blocked_by: BTreeSet::new(),
            blocks: BTreeSet::new(),
            description: String::new(),
        }
    }

    pub fn with_blocked_by<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_by.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_blocks<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocks.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sort key used everywhere a deterministic item order is needed.
    pub fn sort_key(&self) -> (Priority, &str) {
        (self.priority, self.id.as_str())
    }

    pub fn display_name(&self) -> String {
        match &self.title {
            Some(title) if !title.trim().is_empty() => format!("{} {}", self.id, title.trim()),
            _ => self.id.clone(),
        }
    }
}
