//! Merge coordination: one mutex around the shared repository, with
//! stash/restore of unrelated local changes and a fixed exclusion list.

mod coordinator;
mod exclusions;

pub use coordinator::{MergeCoordinator, MergeOutcome};
pub use exclusions::StashExclusions;
