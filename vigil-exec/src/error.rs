//! Execution layer error types.

use thiserror::Error;

/// Errors that can occur while driving a trading cycle.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Brokerage communication or API error
    #[error("Broker error: {0}")]
    Broker(String),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] vigil_store::StoreError),
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
