use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    /// No candidate browser could be launched. Fatal for the current call.
    #[error("no usable browser could be launched")]
    BrowserUnavailable,
    #[error("challenge was not resolved within {0:?}")]
    Timeout(Duration),
    #[error("challenge wait was cancelled")]
    Cancelled,
    #[error("browser driver error: {0}")]
    Driver(String),
}
