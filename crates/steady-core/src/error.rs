//! Error types for steady
//!
//! Stabilization itself never fails: a write or an evaluation always
//! resolves to a committed value. The fallible surface is configuration
//! loading and JSON handling around the core.

use thiserror::Error;

/// Steady error types
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration document is malformed or names an unknown setting
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON could not be parsed or serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for steady operations
pub type Result<T> = std::result::Result<T, Error>;
