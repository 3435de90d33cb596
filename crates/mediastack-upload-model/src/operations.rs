//! Upload protocol operations.

/// All supported upload operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadOperation {
    /// Store one numbered chunk of a session.
    UploadChunk,
    /// Assemble a session's chunks and hand the result to the media store.
    FinalizeUpload,
    /// Store one or more whole files in a single request.
    UploadFiles,
    /// Report which chunks of a session are present.
    GetUploadStatus,
    /// Discard a session and its chunks.
    AbortUpload,
}

impl UploadOperation {
    /// Returns the operation name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UploadChunk => "UploadChunk",
            Self::FinalizeUpload => "FinalizeUpload",
            Self::UploadFiles => "UploadFiles",
            Self::GetUploadStatus => "GetUploadStatus",
            Self::AbortUpload => "AbortUpload",
        }
    }

    /// Parse an operation from its name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "UploadChunk" => Some(Self::UploadChunk),
            "FinalizeUpload" => Some(Self::FinalizeUpload),
            "UploadFiles" => Some(Self::UploadFiles),
            "GetUploadStatus" => Some(Self::GetUploadStatus),
            "AbortUpload" => Some(Self::AbortUpload),
            _ => None,
        }
    }

    /// Whether the operation mutates scratch or media state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::GetUploadStatus)
    }
}

impl std::fmt::Display for UploadOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
