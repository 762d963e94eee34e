// src/error.rs

//! Unified error handling for the Fandom client.

use std::fmt;

use thiserror::Error;

/// Result type alias for Fandom API operations.
pub type Result<T> = std::result::Result<T, FandomError>;

/// Unified client error type.
#[derive(Error, Debug)]
pub enum FandomError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A remote record could not be interpreted
    #[error("Record error for {context}: {message}")]
    Record { context: String, message: String },

    /// The remote API returned no result for a lookup
    #[error("Not found: {0}")]
    NotFound(String),
}

impl FandomError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a record error with context.
    pub fn record(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Record {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}
