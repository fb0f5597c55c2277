//! Error types for PromptStage
//!
//! This module defines all error types used throughout the library,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for PromptStage operations
///
/// This enum encompasses all possible errors that can occur during
/// template rendering, prompt and session CRUD, message staging,
/// and storage backend interactions.
#[derive(Error, Debug)]
pub enum PromptStageError {
    /// Template validation errors (allow-list violations, missing
    /// restricted parameters, malformed placeholder syntax)
    #[error("Validation error for parameter '{param}': {message}")]
    Validation {
        /// Name of the offending template parameter
        param: String,
        /// Additional message explaining the failure
        message: String,
    },

    /// Prompt lookup by name found nothing during a mutating operation
    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    /// Session lookup by id found nothing during a mutating operation
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Staged message lookup by id found nothing (or it was already spent)
    #[error("Pending message not found: {0}")]
    MessageNotFound(String),

    /// A staged message was offered to a session that does not own it
    #[error("Pending message {message_id} is staged for session {owner}, not {requested}")]
    MessageOwnership {
        /// Id of the staged message
        message_id: String,
        /// Session the message was staged for
        owner: String,
        /// Session that attempted to consume it
        requested: String,
    },

    /// Storage backend errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors (prompt definition files)
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for PromptStage operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
