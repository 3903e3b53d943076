use std::path::PathBuf;
use thiserror::Error;

/// Every way a `venv` command can fail.
///
/// All variants are terminal for the invocation. The dispatcher renders them
/// as a single `venv: <message>` line and exits with status 1.
#[derive(Debug, Error)]
pub enum VenvError {
    /// Malformed invocation. Carries the usage line of the offending verb.
    #[error("{message}")]
    Usage { usage: String, message: String },

    #[error("environment {0} does not exist")]
    NotFound(String),

    #[error("environment {0} already exists")]
    AlreadyExists(String),

    #[error("invalid environment name {0:?}")]
    InvalidName(String),

    #[error("{0}")]
    RootUnavailable(String),

    #[error("failed to create environment {name}: {reason}")]
    CreationFailed { name: String, reason: String },

    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VenvError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// The usage line that should precede the diagnostic, if any.
    pub fn usage(&self) -> Option<&str> {
        match self {
            Self::Usage { usage, .. } => Some(usage),
            _ => None,
        }
    }
}
