use thiserror::Error;

use super::executor::{ExecutorError, GraphError};
use super::state::StateError;

/// Process exit codes reported by the `wavesmith` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    ItemsFailed = 2,
    Interrupted = 3,
    CircularDependency = 10,
    ConfigError = 11,
    StateError = 12,
    IoError = 20,
    Internal = 50,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("executor failed: {0}")]
    Executor(#[from] ExecutorError),
    #[error("config error: {0}")]
    Config(String),
    #[error("invalid input: {0}")]
    Input(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

impl From<GraphError> for CliError {
    fn from(err: GraphError) -> Self {
        Self::Executor(ExecutorError::Graph(err))
    }
}

impl From<StateError> for CliError {
    fn from(err: StateError) -> Self {
        Self::Executor(ExecutorError::State(err))
    }
}

impl CliError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Executor(e) => e.exit_code(),
            Self::Config(_) | Self::Input(_) => ExitCode::ConfigError,
            Self::Io(_) => ExitCode::IoError,
            Self::Anyhow(_) => ExitCode::Internal,
        }
    }
}
