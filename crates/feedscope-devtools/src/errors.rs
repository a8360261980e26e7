//! Error types for the devtools pipeline.

use thiserror::Error;

/// A mutation record rejected by [`crate::reducer::reduce_mutations`].
///
/// `index` is the position of the offending record in the input batch.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The record id is not a well-formed object id.
    #[error("invalid object id at record {index}: {id:?}")]
    InvalidObjectId {
        /// Position in the batch.
        index: usize,
        /// The rejected id.
        id: String,
    },

    /// No typename could be derived for the record.
    #[error("invalid typename at record {index} ({id})")]
    MissingTypename {
        /// Position in the batch.
        index: usize,
        /// Id of the record.
        id: String,
    },
}

impl ValidationError {
    /// Position of the offending record.
    pub fn index(&self) -> usize {
        match self {
            Self::InvalidObjectId { index, .. } | Self::MissingTypename { index, .. } => *index,
        }
    }
}

/// Convenience type alias for reducer results.
pub type Result<T> = std::result::Result<T, ValidationError>;
