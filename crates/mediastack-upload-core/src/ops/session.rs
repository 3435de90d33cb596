//! Session status, abort and sweep.

use std::time::{Duration, SystemTime};

use mediastack_upload_model::input::{AbortUploadInput, GetUploadStatusInput};
use mediastack_upload_model::output::{AbortUploadOutput, SessionStatus};
use tracing::{debug, info, warn};

use crate::error::{UploadServiceError, UploadServiceResult};
use crate::provider::MediaUploader;
use crate::validation::{validate_total_chunks, validate_upload_id};

/// Most missing indices reported by a status probe.
pub const MAX_REPORTED_MISSING: usize = 100;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Session directories examined.
    pub scanned: usize,
    /// Sessions removed.
    pub removed: usize,
    /// Stale sessions left alone: invalid name, busy, or failed removal.
    pub skipped: usize,
}

impl MediaUploader {
    /// Report which chunks of a session are present.
    pub async fn upload_status(
        &self,
        input: GetUploadStatusInput,
    ) -> UploadServiceResult<SessionStatus> {
        let upload_id = self.parse_upload_id(&input.upload_id)?;
        let declared = input
            .total_chunks
            .map(|n| validate_total_chunks(n, self.config.max_total_chunks))
            .transpose()?;

        let exists = self
            .scratch
            .session_exists(&upload_id)
            .await
            .map_err(UploadServiceError::storage("looking up session"))?;
        if !exists {
            return Err(UploadServiceError::SessionNotFound {
                upload_id: upload_id.to_string(),
            });
        }

        let total_chunks = match declared {
            Some(total) => total,
            None => self
                .load_manifest(&upload_id)
                .await?
                .map(|m| m.total_chunks)
                .ok_or(UploadServiceError::MissingField {
                    field: "totalChunks",
                })?,
        };

        let mut progress = self.scan_chunks(&upload_id, total_chunks).await?;
        let complete = progress.missing.is_empty();
        progress.missing.truncate(MAX_REPORTED_MISSING);

        Ok(SessionStatus {
            upload_id: upload_id.to_string(),
            total_chunks,
            uploaded_chunks: progress.present,
            received_bytes: progress.bytes,
            missing_chunks: progress.missing,
            complete,
        })
    }

    /// Discard a session and its chunks. Idempotent.
    pub async fn abort_upload(
        &self,
        input: AbortUploadInput,
    ) -> UploadServiceResult<AbortUploadOutput> {
        let upload_id = self.parse_upload_id(&input.upload_id)?;
        let _guard = self.locks.lock(upload_id.as_str()).await;
        let removed = self
            .scratch
            .remove_session(&upload_id)
            .await
            .map_err(UploadServiceError::storage("removing session"))?;
        info!(upload_id = %upload_id, removed, "aborted upload");
        Ok(AbortUploadOutput {
            upload_id: upload_id.to_string(),
            removed,
        })
    }

    /// Remove sessions idle for longer than `max_age`.
    ///
    /// Sessions with a finalize or abort in flight are skipped, as are
    /// directories whose names are not valid upload ids.
    pub async fn sweep_stale_sessions(&self, max_age: Duration) -> UploadServiceResult<SweepReport> {
        let sessions = self
            .scratch
            .list_sessions()
            .await
            .map_err(UploadServiceError::storage("listing sessions"))?;
        let now = SystemTime::now();
        let mut report = SweepReport {
            scanned: sessions.len(),
            ..SweepReport::default()
        };

        for session in sessions {
            // Clock skew makes a future mtime look fresh.
            let idle = now.duration_since(session.modified).unwrap_or_default();
            if idle < max_age {
                continue;
            }
            let Ok(upload_id) = validate_upload_id(&session.name, &self.id_pattern) else {
                debug!(name = %session.name, "skipping foreign scratch directory");
                report.skipped += 1;
                continue;
            };
            let Some(_guard) = self.locks.try_lock(upload_id.as_str()) else {
                report.skipped += 1;
                continue;
            };
            match self.scratch.remove_session(&upload_id).await {
                Ok(_) => report.removed += 1,
                Err(e) => {
                    warn!(upload_id = %upload_id, error = %e, "failed to sweep session");
                    report.skipped += 1;
                }
            }
        }

        info!(
            scanned = report.scanned,
            removed = report.removed,
            skipped = report.skipped,
            "swept stale upload sessions"
        );
        Ok(report)
    }
}
