//! Error types for feed collaborators.

use feedscope_core::PublicKey;
use thiserror::Error;

/// Errors raised by feed stores, feeds and cursors.
#[derive(Debug, Error)]
pub enum FeedError {
    /// No feed with this key is known to the store.
    #[error("feed not found: {0}")]
    FeedNotFound(String),

    /// The feed has been closed and no longer accepts writes.
    #[error("feed closed: {0}")]
    FeedClosed(String),

    /// A cursor could not be opened.
    #[error("failed to open cursor on {feed}: {reason}")]
    CursorOpen {
        /// Truncated feed key.
        feed: String,
        /// Why the open failed.
        reason: String,
    },

    /// A cursor was read before being opened or after being closed.
    #[error("cursor is not open")]
    CursorClosed,

    /// An appended block did not carry the next sequence number.
    #[error("invalid sequence for {feed}: expected {expected}, got {actual}")]
    InvalidSequence {
        /// Truncated feed key.
        feed: String,
        /// Next sequence number of the feed.
        expected: u64,
        /// Sequence number carried by the block.
        actual: u64,
    },
}

impl FeedError {
    /// Feed-not-found error for `key`.
    pub fn not_found(key: &PublicKey) -> Self {
        Self::FeedNotFound(key.truncate())
    }
}

/// Convenience type alias for feed results.
pub type Result<T> = std::result::Result<T, FeedError>;
