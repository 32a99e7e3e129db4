use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_errors::thiserror::{self, Error};

use super::{TailsReader, TailsWriter};

#[derive(Debug, PartialEq, Error, Clone)]
pub enum TailsError {
    #[error("revocation registry not found: {0}")]
    RegistryNotFound(String),

    #[error("invalid tails location: {0}")]
    InvalidTailsLocation(String),

    #[error("invalid tails filename: {0}")]
    InvalidFilename(String),

    #[error("tails download error: {0}")]
    TailsDownloadError(String),

    #[error("ledger error: {0}")]
    LedgerError(String),

    #[error("io error: {0}")]
    IOError(String),
}

/// `TailsBuilder` is the tails cache abstraction consumed by the credential and
/// proof state machines
#[async_trait]
pub trait TailsBuilder: Clone + Sync + Send {
    /// `open_for_read` returns the shared reader of a local tails file
    ///
    /// Repeated calls for the same filename must return the same handle without
    /// reopening the file
    async fn open_for_read(&self, filename: String) -> Result<Arc<TailsReader>, TailsError>;

    /// `open_for_write` always returns a fresh single-use writer
    async fn open_for_write(&self) -> Result<TailsWriter, TailsError>;

    /// `ensure_local` makes sure the tails file declared by the revocation registry
    /// definition exists locally and returns its filename
    async fn ensure_local(&self, revocation_registry_id: String) -> Result<String, TailsError>;
}

/// `validate_filename` accepts only a single plain path segment
pub fn validate_filename(filename: &str) -> Result<(), TailsError> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains('\0');

    if invalid {
        return Err(TailsError::InvalidFilename(filename.to_string()));
    }

    Ok(())
}
