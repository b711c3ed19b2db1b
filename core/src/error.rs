//! Error types for the todo store.
//!
//! # Design
//! Validation errors (`InvalidInput`, `NotFound`) are raised before anything
//! is mutated. Storage errors raised by a mutation are reported only after the
//! in-memory collection has been put back the way it was.

use thiserror::Error;

use crate::types::TodoId;

/// Errors returned by `TodoStore` operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required field is missing or blank, or an update carries no fields.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No todo with this id exists (any more).
    #[error("todo {0} not found")]
    NotFound(TodoId),

    /// Reading or writing the snapshot failed, or its contents are corrupt.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// The snapshot or the in-memory state cannot be accessed at all.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
