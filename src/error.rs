//! Error types for the weather team runtime.

use thiserror::Error;

/// Errors that can occur while running the agent team.
///
/// Policy blocks and unknown cities are not errors: they travel as
/// structured `status: "error"` results through the conversation.
#[derive(Error, Debug)]
pub enum Error {
    /// Model backend failure
    #[error("Model error: {0}")]
    Model(String),

    /// Maximum iterations reached within a single turn
    #[error("Maximum iterations ({0}) reached")]
    MaxIterations(usize),

    /// A value of the wrong shape was written to a typed state key
    #[error("Invalid value for state key '{key}': {source}")]
    InvalidState {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A guard pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// A tool declared a parameter schema that could not be compiled
    #[error("Invalid schema for tool '{tool}': {message}")]
    ToolSchema { tool: String, message: String },

    /// Session id already taken
    #[error("Session already exists: {0}")]
    SessionExists(String),

    /// Session id not found
    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

/// Result type for weather team operations.
pub type Result<T> = std::result::Result<T, Error>;
