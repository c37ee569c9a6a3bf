//! Work item input: manifest loading and the "already completed" predicate.

mod manifest;

pub use manifest::{archived_ids, ItemManifest};
