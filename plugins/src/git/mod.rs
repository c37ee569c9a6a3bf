//! Git plumbing: the command runner and [`RepositoryOps`] over it.
//!
//! [`RepositoryOps`]: wavesmith_core::api::RepositoryOps

pub mod repository;
pub mod runner;

pub use repository::GitRepositoryOps;
pub use runner::GitRunner;
