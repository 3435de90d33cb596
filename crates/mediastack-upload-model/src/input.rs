//! Decoded request inputs.
//!
//! Numeric fields are kept signed and unvalidated here; bounds checking
//! belongs to the upload service so a negative index is reported as out of
//! range rather than as a decoding failure.

use bytes::Bytes;

/// One file part of a multipart request.
#[derive(Debug, Clone, Default)]
pub struct FilePart {
    /// Form field name the file was sent under.
    pub field_name: String,
    /// Client-supplied file name, if any.
    pub file_name: Option<String>,
    /// Declared `Content-Type` of the part.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Bytes,
}

impl FilePart {
    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Input of [`UploadChunk`](crate::UploadOperation::UploadChunk).
#[derive(Debug, Clone, Default)]
pub struct UploadChunkInput {
    /// Session identifier.
    pub upload_id: String,
    /// Zero-based chunk index.
    pub chunk_index: i64,
    /// Declared number of chunks in the session.
    pub total_chunks: i64,
    /// The chunk payload; `None` when the request carried no file part.
    pub chunk: Option<FilePart>,
}

/// Input of [`FinalizeUpload`](crate::UploadOperation::FinalizeUpload).
#[derive(Debug, Clone, Default)]
pub struct FinalizeUploadInput {
    /// Session identifier.
    pub upload_id: String,
    /// Declared number of chunks in the session.
    pub total_chunks: i64,
    /// Display name of the assembled file.
    pub file_name: Option<String>,
    /// Declared size of the assembled file.
    pub file_size: Option<u64>,
    /// Declared MIME type of the assembled file.
    pub file_type: Option<String>,
    /// Media context tag.
    pub context: Option<String>,
    /// Requested media provider.
    pub provider: Option<String>,
}

/// Input of [`UploadFiles`](crate::UploadOperation::UploadFiles).
#[derive(Debug, Clone, Default)]
pub struct UploadFilesInput {
    /// Files in request order.
    pub files: Vec<FilePart>,
    /// Media context tag.
    pub context: Option<String>,
    /// Requested media provider.
    pub provider: Option<String>,
}

/// Input of [`GetUploadStatus`](crate::UploadOperation::GetUploadStatus).
#[derive(Debug, Clone, Default)]
pub struct GetUploadStatusInput {
    /// Session identifier.
    pub upload_id: String,
    /// Expected number of chunks; falls back to the session manifest.
    pub total_chunks: Option<i64>,
}

/// Input of [`AbortUpload`](crate::UploadOperation::AbortUpload).
#[derive(Debug, Clone, Default)]
pub struct AbortUploadInput {
    /// Session identifier.
    pub upload_id: String,
}
