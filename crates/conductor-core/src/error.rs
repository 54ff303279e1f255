//! Error types for Conductor Core

use thiserror::Error;

/// Result type alias using Conductor Error
pub type Result<T> = std::result::Result<T, Error>;

/// Conductor error types
#[derive(Error, Debug)]
pub enum Error {
    /// A worker failed inside `generate_response`
    #[error("Agent error: {0}")]
    Agent(String),

    /// A worker factory failed while activating the session
    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Provider error: {0}")]
    Provider(String),

    /// The reasoning engine refused to produce content
    #[error("Content blocked: {0}")]
    ContentBlocked(String),

    #[error("Artifact store error: {0}")]
    Store(String),

    /// A progress sink could not deliver an event
    #[error("Progress sink error: {0}")]
    Sink(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Function error: {0}")]
    Function(#[from] FunctionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised by locally executed engine functions
#[derive(Error, Debug)]
pub enum FunctionError {
    #[error("Function not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}
