//! Upload operation handlers.
//!
//! Each submodule adds methods to [`crate::provider::MediaUploader`]:
//!
//! - [`chunk`]: store one chunk of a session
//! - [`finalize`]: assemble a session and hand it to the media store
//! - [`files`]: single-shot upload of whole files
//! - [`session`]: status probe, abort and sweep of abandoned sessions
//!
//! The server binary bridges these to the HTTP layer by implementing the
//! `UploadHandler` trait from `mediastack-upload-http`.

pub mod chunk;
pub mod files;
pub mod finalize;
pub mod session;

use mediastack_core::UploadId;
use tracing::warn;

use crate::error::{UploadServiceError, UploadServiceResult};
use crate::manifest::SessionManifest;
use crate::provider::MediaUploader;
use crate::scratch::{MANIFEST_BLOB, parse_chunk_blob_name};

/// Which of a session's expected chunk slots are filled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ChunkProgress {
    /// Present slots.
    pub(crate) present: u32,
    /// Sum of present chunk sizes.
    pub(crate) bytes: u64,
    /// Absent zero-based indices in ascending order.
    pub(crate) missing: Vec<u32>,
}

impl MediaUploader {
    /// Scan the session for chunks `0..total_chunks`.
    pub(crate) async fn scan_chunks(
        &self,
        upload_id: &UploadId,
        total_chunks: u32,
    ) -> UploadServiceResult<ChunkProgress> {
        let blobs = self
            .scratch
            .list_blobs(upload_id)
            .await
            .map_err(UploadServiceError::storage("listing chunks"))?;

        let mut sizes = vec![None; total_chunks as usize];
        for blob in blobs {
            if let Some(index) = parse_chunk_blob_name(&blob.name) {
                if let Some(slot) = sizes.get_mut(index as usize) {
                    *slot = Some(blob.size);
                }
            }
        }

        let mut progress = ChunkProgress::default();
        for (index, size) in (0..total_chunks).zip(sizes) {
            match size {
                Some(size) => {
                    progress.present += 1;
                    progress.bytes += size;
                }
                None => progress.missing.push(index),
            }
        }
        Ok(progress)
    }

    /// Read the session manifest, if one was written.
    pub(crate) async fn load_manifest(
        &self,
        upload_id: &UploadId,
    ) -> UploadServiceResult<Option<SessionManifest>> {
        let Some(data) = self
            .scratch
            .read_blob(upload_id, MANIFEST_BLOB)
            .await
            .map_err(UploadServiceError::storage("reading session manifest"))?
        else {
            return Ok(None);
        };
        let manifest = SessionManifest::from_slice(&data).map_err(|e| {
            UploadServiceError::Internal(anyhow::anyhow!(
                "corrupt manifest for upload {upload_id}: {e}"
            ))
        })?;
        Ok(Some(manifest))
    }

    /// Reject `declared` if it disagrees with the recorded chunk count.
    ///
    /// A no-op when pinning is disabled or no manifest exists yet.
    pub(crate) async fn check_pinned_total(
        &self,
        upload_id: &UploadId,
        declared: u32,
    ) -> UploadServiceResult<()> {
        if !self.config.pin_total_chunks {
            return Ok(());
        }
        match self.load_manifest(upload_id).await? {
            Some(manifest) => ensure_same_total(upload_id, &manifest, declared),
            None => Ok(()),
        }
    }

    /// Record `declared` as the session's chunk count unless one is recorded.
    ///
    /// The session must already exist. Losing a concurrent create falls back
    /// to comparing against the winner's manifest.
    pub(crate) async fn pin_total_chunks(
        &self,
        upload_id: &UploadId,
        declared: u32,
    ) -> UploadServiceResult<()> {
        if !self.config.pin_total_chunks {
            return Ok(());
        }
        let manifest = SessionManifest::new(upload_id.as_str(), declared);
        let data = manifest
            .to_bytes()
            .map_err(|e| UploadServiceError::Internal(e.into()))?;
        let created = self
            .scratch
            .create_blob(upload_id, MANIFEST_BLOB, data)
            .await
            .map_err(UploadServiceError::storage("writing session manifest"))?;
        if created {
            return Ok(());
        }
        self.check_pinned_total(upload_id, declared).await
    }

    /// Remove the whole session, logging failures.
    pub(crate) async fn discard_session(&self, upload_id: &UploadId) {
        if let Err(e) = self.scratch.remove_session(upload_id).await {
            warn!(upload_id = %upload_id, error = %e, "failed to remove upload session");
        }
    }

    /// Delete one blob, logging failures.
    pub(crate) async fn delete_blob_quietly(&self, upload_id: &UploadId, name: &str) {
        if let Err(e) = self.scratch.delete_blob(upload_id, name).await {
            warn!(upload_id = %upload_id, name, error = %e, "failed to delete scratch blob");
        }
    }
}

fn ensure_same_total(
    upload_id: &UploadId,
    manifest: &SessionManifest,
    declared: u32,
) -> UploadServiceResult<()> {
    if manifest.total_chunks == declared {
        Ok(())
    } else {
        Err(UploadServiceError::TotalChunksMismatch {
            upload_id: upload_id.to_string(),
            expected: manifest.total_chunks,
            declared,
        })
    }
}
