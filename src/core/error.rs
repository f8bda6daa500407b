//! Custom error types for the RLM agent
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for RLM operations
#[derive(Error, Debug)]
pub enum RlmError {
    /// Model endpoint connection or API errors
    #[error("Endpoint error: {0}")]
    Endpoint(String),

    /// REPL environment errors (spawn/protocol failures, not snippet errors)
    #[error("REPL error: {0}")]
    Repl(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Trace sink errors
    #[error("Trace error: {0}")]
    Trace(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Model not available at the endpoint
    #[error("Model '{0}' not available at the endpoint")]
    ModelNotFound(String),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for RLM operations
pub type Result<T> = std::result::Result<T, RlmError>;

impl RlmError {
    /// Create an endpoint error
    pub fn endpoint(msg: impl Into<String>) -> Self {
        Self::Endpoint(msg.into())
    }

    /// Create a REPL error
    pub fn repl(msg: impl Into<String>) -> Self {
        Self::Repl(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
