//! Error types for nlquery
//!
//! None of the session errors are fatal: a failed conversation bootstrap
//! degrades to stateless mode and a failed query becomes a visible history
//! entry. Only configuration and I/O errors stop the CLI.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NlQueryError {
    /// Conversation bootstrap failed
    #[error("Could not create conversation: {0}")]
    SessionCreation(String),

    /// Submitting a prompt failed (transport, status, or payload)
    #[error("Query failed: {0}")]
    Query(String),

    /// Prompt was empty or whitespace-only
    #[error("Prompt is empty")]
    EmptyInput,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NlQueryError {
    /// Message suitable for showing next to a failed exchange.
    pub fn user_message(&self) -> String {
        match self {
            NlQueryError::Query(message) | NlQueryError::SessionCreation(message) => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NlQueryError>;
