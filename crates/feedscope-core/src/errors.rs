//! Error types for the foundation crate.

use thiserror::Error;

/// Errors raised while parsing or decoding foundation types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A key string was not valid hex or was empty.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Convenience type alias for foundation results.
pub type Result<T> = std::result::Result<T, CoreError>;
