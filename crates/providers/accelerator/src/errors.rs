//! Error types for the accelerator.

use alloy_transport::TransportError;
use std::io;
use thiserror::Error;

/// An error returned by an [`EthProvider`](crate::EthProvider).
///
/// Storage and admission failures never surface here: the receipt cache degrades to a
/// pass-through instead of failing the call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The underlying transport failed or the node returned an error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A [`Result`] alias for [`ProviderError`].
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that may occur while interacting with a
/// [`KeyValueStore`](crate::KeyValueStore).
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error from the backing medium.
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// The temporary file holding a write could not be moved into place.
    #[error("failed to persist storage entry: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// The storage backend is not available in this environment.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors that may occur while writing to the receipt cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store failed.
    #[error("receipt cache storage error: {0}")]
    Storage(#[from] StorageError),

    /// The cache contents could not be encoded.
    #[error("receipt cache encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}
