use conformal_core::ConformalError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FraudError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Invalid features: {0}")]
    InvalidFeatures(String),

    #[error("Conformal error: {0}")]
    Conformal(#[from] ConformalError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type FraudResult<T> = Result<T, FraudError>;
