//! Flowpipe error abstractions.

use thiserror::Error;

/// Store error variants.
///
/// Request handlers map these onto user-facing response codes; the controller
/// treats every variant except `Cancelled` as retryable.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The given input was invalid.
    #[error("invalid input: {0}")]
    Invalid(String),
    /// The named entity does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// The named entity exists, but the requested version does not.
    #[error("version {version} of {name} does not exist")]
    UnknownVersion { name: String, version: u64 },
    /// A compare-and-swap predicate failed against a concurrent writer.
    #[error("{0} was modified concurrently")]
    Conflict(String),
    /// The backend transport failed or returned undecodable data.
    #[error("store backend failure")]
    Backend(#[source] anyhow::Error),
    /// The operation deadline elapsed or the operation was cancelled.
    #[error("store operation timed out or was cancelled")]
    Cancelled,
}

impl StoreError {
    /// Wrap the given error as a backend failure.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(anyhow::Error::new(err))
    }
}

/// A result type used throughout the store layer.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
