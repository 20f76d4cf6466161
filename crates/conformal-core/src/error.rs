use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConformalError {
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Nonconformity scores are empty")]
    EmptyScores,
}

pub type ConformalResult<T> = Result<T, ConformalError>;
