//! Shared error definitions for hostcall primitives.

use thiserror::Error;

/// Result alias used by the primitives crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The request body could not be decoded as JSON.
    #[error("invalid request body: {reason}")]
    InvalidBody {
        /// Human-readable decoding failure.
        reason: String,
    },
}
