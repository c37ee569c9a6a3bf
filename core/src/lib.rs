//! Dependency-aware parallel execution of work items against a shared
//! repository: wave planning, contention refinement, bounded workers,
//! serialized merges and resumable state.

pub mod api;
pub mod config;
pub mod contention;
pub mod context;
pub mod error;
pub mod executor;
pub mod graph;
pub mod input;
pub mod merge;
pub mod state;
