#[allow(clippy::module_inception)]
pub mod error;
pub mod executor;
pub mod state;
pub mod vcs;

pub use error::{CliError, ExitCode};
pub use executor::{ExecutorError, GraphError};
pub use state::StateError;
pub use vcs::VcsError;
