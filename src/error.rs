//! Error types for Syllabus.

use thiserror::Error;

/// Library-level error type for Syllabus operations.
#[derive(Error, Debug)]
pub enum SyllabusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model provider error: {0}")]
    Model(String),

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidToolArguments { tool: String, reason: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool '{tool}' failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    #[error("Content store error: {0}")]
    ContentStore(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Agent error: {0}")]
    Agent(String),
}

/// Result type alias for Syllabus operations.
pub type Result<T> = std::result::Result<T, SyllabusError>;
