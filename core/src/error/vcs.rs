use thiserror::Error;

/// Failures talking to the version-control tool.
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("failed to spawn git {args}: {source}")]
    Spawn {
        args: String,
        source: std::io::Error,
    },

    #[error("git {args} exited with {}: {stderr}", code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    CommandFailed {
        args: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("not a git repository: {0}")]
    NotARepository(String),
}

impl VcsError {
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
