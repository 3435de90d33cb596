//! Session manifest pinning the chunk count of an upload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bookkeeping written by the first chunk of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionManifest {
    /// Session identifier.
    pub upload_id: String,
    /// Chunk count declared by the first chunk.
    pub total_chunks: u32,
    /// When the session was started.
    pub created_at: DateTime<Utc>,
}

impl SessionManifest {
    /// Create a manifest stamped with the current time.
    #[must_use]
    pub fn new(upload_id: impl Into<String>, total_chunks: u32) -> Self {
        Self {
            upload_id: upload_id.into(),
            total_chunks,
            created_at: Utc::now(),
        }
    }

    /// Encode as JSON.
    pub fn to_bytes(&self) -> Result<bytes::Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(bytes::Bytes::from)
    }

    /// Decode from JSON.
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_encode_camel_case() {
        let manifest = SessionManifest::new("abc", 4);
        let bytes = manifest.to_bytes().expect("encode manifest");
        let text = std::str::from_utf8(&bytes).expect("utf8");
        assert!(text.contains("\"totalChunks\":4"));
        assert!(text.contains("\"uploadId\":\"abc\""));
        assert_eq!(SessionManifest::from_slice(&bytes).expect("decode"), manifest);
    }
}
