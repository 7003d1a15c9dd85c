use thiserror::Error;

use svcmon_scm::ScmError;

/// Failure surfaced by the supervisor's public operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to connect to the service control manager: {0}")]
    Connect(#[source] ScmError),

    #[error("failed to enumerate services: {0}")]
    Enumerate(#[source] ScmError),

    #[error("failed to admit service '{name}': {source}")]
    Admit {
        name: String,
        #[source]
        source: ScmError,
    },

    #[error("failed to spawn the listener worker for '{name}': {source}")]
    Worker {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to disconnect from the service control manager: {0}")]
    Disconnect(#[source] ScmError),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
