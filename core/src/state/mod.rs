//! Execution state: item statuses, transition rules and the atomic
//! on-disk store used for resume.

pub mod store;
pub mod transitions;
pub mod types;

pub use store::{ExecutionState, StateStore};
pub use transitions::StatusTransition;
pub use types::{ItemStatus, StatusCounts};
