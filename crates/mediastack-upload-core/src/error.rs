//! Upload service error types.
//!
//! Defines [`UploadServiceError`], the domain error of the upload service.
//! Each variant maps to an [`UploadErrorCode`] through the [`From`]
//! implementation, which produces the wire error returned to clients.
//!
//! # Usage
//!
//! ```
//! use mediastack_upload_core::error::UploadServiceError;
//! use mediastack_upload_model::{UploadError, UploadErrorCode};
//!
//! let err = UploadServiceError::MissingChunk {
//!     position: 2,
//!     total_chunks: 3,
//! };
//! let wire: UploadError = err.into();
//! assert_eq!(wire.code, UploadErrorCode::MissingChunk);
//! assert_eq!(wire.message, "Missing chunk 2 of 3");
//! ```

use std::io;

use mediastack_core::MediaStackError;
use mediastack_upload_model::{UploadError, UploadErrorCode};

use crate::media::MediaStoreError;

/// Upload service error type.
#[derive(Debug, thiserror::Error)]
pub enum UploadServiceError {
    // -----------------------------------------------------------------------
    // Request validation
    // -----------------------------------------------------------------------
    /// The upload id is empty, too long, or contains disallowed characters.
    #[error("Invalid upload id: {upload_id:?}")]
    InvalidUploadId {
        /// The rejected identifier.
        upload_id: String,
    },

    /// `totalChunks` is not in `1..=max`.
    #[error("Invalid totalChunks {total_chunks}: must be between 1 and {max}")]
    InvalidTotalChunks {
        /// The declared value.
        total_chunks: i64,
        /// Configured upper bound.
        max: u32,
    },

    /// `chunkIndex` is not in `[0, totalChunks)`.
    #[error("Chunk index {chunk_index} out of range for {total_chunks} chunks")]
    ChunkIndexOutOfRange {
        /// The declared index.
        chunk_index: i64,
        /// The declared chunk count.
        total_chunks: u32,
    },

    /// The chunk request carried no file part.
    #[error("No chunk file received")]
    MissingChunkPayload,

    /// The chunk payload exceeds the configured limit.
    #[error("Chunk of {size} bytes exceeds the maximum of {max} bytes")]
    ChunkTooLarge {
        /// Payload size.
        size: u64,
        /// Configured limit.
        max: u64,
    },

    /// A required field is absent.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Wire name of the field.
        field: &'static str,
    },

    // -----------------------------------------------------------------------
    // Session state
    // -----------------------------------------------------------------------
    /// The declared chunk count disagrees with the one recorded for the session.
    #[error(
        "Upload {upload_id} was started with {expected} chunks, request declares {declared}"
    )]
    TotalChunksMismatch {
        /// Session identifier.
        upload_id: String,
        /// Count recorded by the first chunk.
        expected: u32,
        /// Count declared by this request.
        declared: u32,
    },

    /// No scratch directory exists for the session.
    #[error("Upload session not found")]
    SessionNotFound {
        /// Session identifier.
        upload_id: String,
    },

    /// A chunk slot is empty at finalize. `position` is 1-based.
    #[error("Missing chunk {position} of {total_chunks}")]
    MissingChunk {
        /// 1-based position of the first absent chunk.
        position: u32,
        /// The declared chunk count.
        total_chunks: u32,
    },

    /// The assembled size differs from the declared size.
    #[error("Assembled size {actual} does not match declared size {declared}")]
    SizeMismatch {
        /// Size declared by the client.
        declared: u64,
        /// Measured size.
        actual: u64,
    },

    /// A single-shot file exceeds the configured limit.
    #[error("File of {size} bytes exceeds the maximum of {max} bytes")]
    FileTooLarge {
        /// Payload size.
        size: u64,
        /// Configured limit.
        max: u64,
    },

    // -----------------------------------------------------------------------
    // Storage
    // -----------------------------------------------------------------------
    /// Scratch storage failed.
    #[error("Scratch storage failure while {operation}: {source}")]
    Storage {
        /// What the service was doing.
        operation: &'static str,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A chunk could not be read during assembly. `position` is 1-based.
    #[error("Could not read chunk {position} of {total_chunks}: {source}")]
    ChunkUnreadable {
        /// 1-based position of the chunk.
        position: u32,
        /// The declared chunk count.
        total_chunks: u32,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    // -----------------------------------------------------------------------
    // Collaborators / catch-all
    // -----------------------------------------------------------------------
    /// The media store failed to create the record.
    #[error(transparent)]
    MediaStore(#[from] MediaStoreError),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl UploadServiceError {
    /// Convert into the wire error returned to clients.
    #[must_use]
    pub fn into_upload_error(self) -> UploadError {
        UploadError::from(self)
    }

    /// Build a closure wrapping an I/O error as [`UploadServiceError::Storage`].
    pub(crate) fn storage(operation: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Storage { operation, source }
    }
}

impl From<UploadServiceError> for UploadError {
    fn from(err: UploadServiceError) -> Self {
        let resource = match &err {
            UploadServiceError::InvalidUploadId { upload_id }
            | UploadServiceError::TotalChunksMismatch { upload_id, .. }
            | UploadServiceError::SessionNotFound { upload_id } => Some(upload_id.clone()),
            _ => None,
        };
        let code = error_code(&err);
        let message = err.to_string();

        let wire = UploadError::with_message(code, message).with_source(err);
        match resource {
            Some(resource) => wire.with_resource(resource),
            None => wire,
        }
    }
}

impl From<MediaStackError> for UploadServiceError {
    fn from(err: MediaStackError) -> Self {
        match err {
            MediaStackError::InvalidUploadId(upload_id) => Self::InvalidUploadId { upload_id },
            MediaStackError::Config(message) => Self::Internal(anyhow::anyhow!(message)),
            MediaStackError::Internal(e) => Self::Internal(e),
        }
    }
}

fn error_code(err: &UploadServiceError) -> UploadErrorCode {
    match err {
        UploadServiceError::InvalidUploadId { .. } => UploadErrorCode::InvalidUploadId,
        UploadServiceError::InvalidTotalChunks { .. } | UploadServiceError::MissingField { .. } => {
            UploadErrorCode::InvalidArgument
        }
        UploadServiceError::ChunkIndexOutOfRange { .. } => UploadErrorCode::ChunkIndexOutOfRange,
        UploadServiceError::MissingChunkPayload => UploadErrorCode::MissingChunkPayload,
        UploadServiceError::ChunkTooLarge { .. } | UploadServiceError::FileTooLarge { .. } => {
            UploadErrorCode::EntityTooLarge
        }
        UploadServiceError::TotalChunksMismatch { .. } => UploadErrorCode::TotalChunksMismatch,
        UploadServiceError::SessionNotFound { .. } => UploadErrorCode::NoSuchUpload,
        UploadServiceError::MissingChunk { .. } => UploadErrorCode::MissingChunk,
        UploadServiceError::SizeMismatch { .. } => UploadErrorCode::SizeMismatch,
        UploadServiceError::MediaStore(_) => UploadErrorCode::MediaStoreFailure,
        UploadServiceError::Storage { .. }
        | UploadServiceError::ChunkUnreadable { .. }
        | UploadServiceError::Internal(_) => UploadErrorCode::InternalError,
    }
}

/// Convenience result type for upload service operations.
pub type UploadServiceResult<T> = Result<T, UploadServiceError>;
