//! Errors surfaced by the access-control backends.

use crate::{client::TransportError, graph::turtle::ParseError};
use thiserror::Error;

/// Failure of a backend operation.
///
/// The variants are distinguishable so that callers can, for example, show an
/// empty state for [`BackendError::DocumentNotFound`] but offer a retry for
/// [`BackendError::RemoteWriteRejected`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// The probe could not tell which protocol the storage speaks.
    #[error("Could not detect the access control protocol of {url}: {reason}")]
    ProtocolDetectionFailed {
        url: String,
        reason: String,
        #[source]
        source: Option<TransportError>,
    },

    /// An access control document that must exist was not found.
    #[error("Access control document not found: {0}")]
    DocumentNotFound(String),

    /// Reading a document returned an unexpected status.
    #[error("Reading {url} failed with status {status}")]
    RemoteReadFailed { url: String, status: u16 },

    /// A create or patch request returned a non-success status.
    ///
    /// Do not replay the same patch after this on an Authorization-List
    /// backend: re-run the whole read-diff-write cycle instead.
    #[error("Writing {url} was rejected with status {status}")]
    RemoteWriteRejected { url: String, status: u16 },

    /// The document exists but could not be parsed.
    #[error("Malformed document at {url}: {source}")]
    MalformedDocument {
        url: String,
        #[source]
        source: ParseError,
    },

    /// A block the engine would have to delete cannot be addressed by a patch.
    #[error("Authorization in {url} uses a blank node and cannot be patched")]
    UnaddressableAuthorization { url: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl BackendError {
    pub(crate) fn detection<U: ToString, R: Into<String>>(url: U, reason: R) -> Self {
        BackendError::ProtocolDetectionFailed {
            url: url.to_string(),
            reason: reason.into(),
            source: None,
        }
    }

    /// The HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::RemoteReadFailed { status, .. }
            | BackendError::RemoteWriteRejected { status, .. } => Some(*status),
            BackendError::DocumentNotFound(_) => Some(404),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::DocumentNotFound(_))
    }

    /// Whether re-running the full operation may succeed.
    ///
    /// Structural problems (unparseable documents, unknown protocols) will
    /// not go away on their own.
    pub fn is_retryable_by_rerun(&self) -> bool {
        match self {
            BackendError::Transport(_) => true,
            BackendError::RemoteWriteRejected { status, .. }
            | BackendError::RemoteReadFailed { status, .. } => {
                *status == 409 || *status == 412 || *status >= 500
            }
            BackendError::ProtocolDetectionFailed { source, .. } => source.is_some(),
            BackendError::DocumentNotFound(_)
            | BackendError::MalformedDocument { .. }
            | BackendError::UnaddressableAuthorization { .. } => false,
        }
    }
}
