use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid room url: {0}")]
    InvalidUrl(String),
    /// Transport-level failure. Reported, never retried by the pipeline.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("extraction cancelled")]
    Cancelled,
    #[error("challenge solver error: {0}")]
    Solver(String),
}
