//! JSON response bodies.
//!
//! Field names follow the camelCase wire format expected by upload clients.

use serde::Serialize;

/// Response to a stored chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkReceipt {
    /// Always `true`; failures are reported through [`UploadError`](crate::UploadError).
    pub success: bool,
    /// Index of the chunk just stored.
    pub chunk_index: u32,
    /// Declared number of chunks in the session.
    pub total_chunks: u32,
    /// Number of expected chunk slots now present.
    pub uploaded_chunks: u32,
    /// Sum of the sizes of the present chunks.
    pub received_bytes: u64,
}

/// A persisted media record as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRecord {
    /// Media identifier assigned by the store.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Public URL of the stored file.
    pub url: String,
    /// Storage reference inside the media store.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    #[serde(rename = "type")]
    pub content_type: String,
}

/// Per-file failure entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    /// Client-supplied file name.
    pub name: String,
    /// Human-readable reason.
    pub error: String,
}

/// One entry of a `files` response list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FileEntry {
    /// The file was persisted.
    Uploaded(MediaRecord),
    /// The file was rejected.
    Failed(FileFailure),
}

impl FileEntry {
    /// Build a failure entry.
    #[must_use]
    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Failed(FileFailure {
            name: name.into(),
            error: error.into(),
        })
    }

    /// Whether this entry is a success.
    #[must_use]
    pub fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded(_))
    }
}

/// Response carrying a list of file entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilesOutput {
    /// Entries in request order.
    pub files: Vec<FileEntry>,
}

/// Completeness report of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Session identifier.
    pub upload_id: String,
    /// Number of chunks the report was computed against.
    pub total_chunks: u32,
    /// Number of expected chunk slots present.
    pub uploaded_chunks: u32,
    /// Sum of the sizes of the present chunks.
    pub received_bytes: u64,
    /// Absent zero-based indices, truncated to a bounded prefix.
    pub missing_chunks: Vec<u32>,
    /// Whether every expected chunk is present.
    pub complete: bool,
}

/// Response to an abort request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortUploadOutput {
    /// Session identifier.
    pub upload_id: String,
    /// Whether a session directory was removed.
    pub removed: bool,
}
