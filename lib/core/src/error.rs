use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Degenerate vector: {0}")]
    DegenerateVector(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Embedding provider error: {0}")]
    Embedding(String),

    #[error("Match took {elapsed:?}, over the {limit:?} budget")]
    Timeout { elapsed: Duration, limit: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("CSV error: {0}")]
    Csv(String),
}
