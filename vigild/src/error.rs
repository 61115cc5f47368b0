//! Daemon error types.

use thiserror::Error;

/// Errors that can occur in the daemon runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Execution layer error
    #[error("Execution error: {0}")]
    Exec(#[from] vigil_exec::ExecError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] vigil_store::StoreError),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
