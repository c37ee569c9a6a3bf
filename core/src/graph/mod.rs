//! Dependency graph construction and wave decomposition.
//!
//! ```text
//! Vec<WorkItem> + completed ids
//!   ↓
//! DependencyGraph::build()      (arena + blockers/dependents adjacency)
//!   ↓
//! DependencyGraph::validate()   (three-colour DFS cycle scan)
//!   ↓
//! DependencyGraph::get_execution_waves() → Vec<Wave>
//! ```

#[allow(clippy::module_inception)]
mod graph;
mod item;

pub use graph::{BlockedItem, DependencyGraph, OrphanPolicy, UnresolvedBlocker, Wave};
pub use item::{Priority, WorkItem};
