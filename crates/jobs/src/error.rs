//! Job store error.

use jobkeeper_core::JobId;
use jobkeeper_docstore::DocumentStoreError;

/// Job store operation error.
///
/// Nothing here is retried internally: every failure surfaces to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStoreError {
    /// The targeted job does not exist (or, for a guarded write, no longer
    /// matches what the caller loaded).
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("job already exists: {0}")]
    DuplicateKey(JobId),

    #[error("{0} is not implemented by this store")]
    Unsupported(&'static str),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A persisted document could not be read back as a job.
    #[error("corrupt job document '{id}': {reason}")]
    Corrupt { id: String, reason: String },
}

impl JobStoreError {
    pub(crate) fn corrupt(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

impl From<DocumentStoreError> for JobStoreError {
    fn from(err: DocumentStoreError) -> Self {
        match err {
            DocumentStoreError::NotFound(raw) => match raw.parse() {
                Ok(id) => Self::NotFound(id),
                Err(e) => Self::corrupt(raw, e.to_string()),
            },
            DocumentStoreError::DuplicateKey(raw) => match raw.parse() {
                Ok(id) => Self::DuplicateKey(id),
                Err(e) => Self::corrupt(raw, e.to_string()),
            },
            DocumentStoreError::MissingId => Self::corrupt("", "document has no id"),
            DocumentStoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
        }
    }
}
