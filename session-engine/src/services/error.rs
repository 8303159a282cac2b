use thiserror::Error;

use crate::services::policy::PolicyError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Authentication error: {0}")]
    Authentication(anyhow::Error),

    #[error("Missing context: {0}")]
    MissingContext(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    #[error("Network error: {0}")]
    Network(anyhow::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Signature order failed: {0}")]
    SignatureFailed(String),

    #[error("Signature order timed out: {0}")]
    SignatureTimeout(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Password policy violation: {0}")]
    Policy(#[from] PolicyError),

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::Network(anyhow::Error::new(err))
    }
}

impl From<jsonwebtoken::errors::Error> for EngineError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        EngineError::TokenInvalid(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Network(anyhow::anyhow!("Malformed response body: {}", err))
    }
}
