//! Finalizer: assemble a session and commit it to the media store.
//!
//! Finalize runs under the session lock. A gap in the chunk sequence is
//! detected by a presence scan before anything is modified, so that failure
//! leaves the session intact and retryable. Once assembly succeeds the
//! chunks are gone, and the session directory is removed whether or not the
//! media store accepts the file.

use mediastack_core::UploadId;
use mediastack_upload_model::input::FinalizeUploadInput;
use mediastack_upload_model::output::MediaRecord;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{UploadServiceError, UploadServiceResult};
use crate::media::{MediaSource, NewMedia};
use crate::provider::MediaUploader;
use crate::scratch::{AssembledBlob, chunk_blob_name};
use crate::validation::{
    or_default, resolve_content_type, sanitize_file_name, validate_total_chunks,
};

/// Metadata of the file being finalized.
#[derive(Debug)]
struct FinalizeTarget {
    name: String,
    content_type: mime::Mime,
    context: String,
    provider: Option<String>,
    declared_size: Option<u64>,
}

impl MediaUploader {
    /// Assemble all chunks of a session and create a media record.
    pub async fn finalize_upload(
        &self,
        input: FinalizeUploadInput,
    ) -> UploadServiceResult<MediaRecord> {
        let upload_id = self.parse_upload_id(&input.upload_id)?;
        let total_chunks = validate_total_chunks(input.total_chunks, self.config.max_total_chunks)?;
        let target = FinalizeTarget {
            name: sanitize_file_name(input.file_name.as_deref().unwrap_or_default()),
            content_type: resolve_content_type(input.file_type.as_deref()),
            context: or_default(input.context.as_deref(), &self.config.default_context),
            provider: input.provider,
            declared_size: input.file_size,
        };

        let _guard = self.locks.lock(upload_id.as_str()).await;

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
        self.check_pinned_total(&upload_id, total_chunks).await?;

        let progress = self.scan_chunks(&upload_id, total_chunks).await?;
        if let Some(&first) = progress.missing.first() {
            warn!(
                upload_id = %upload_id,
                missing = progress.missing.len(),
                total_chunks,
                "finalize with incomplete upload"
            );
            return Err(UploadServiceError::MissingChunk {
                position: first + 1,
                total_chunks,
            });
        }

        let assembled = self.assemble(&upload_id, total_chunks).await?;
        let result = self.commit(&upload_id, &assembled, target).await;
        self.delete_blob_quietly(&upload_id, &assembled.name).await;
        self.discard_session(&upload_id).await;
        result
    }

    /// Concatenate chunks `0..total_chunks` into a new output blob.
    ///
    /// On failure the partial output is deleted and chunks not yet released
    /// stay in place.
    async fn assemble(
        &self,
        upload_id: &UploadId,
        total_chunks: u32,
    ) -> UploadServiceResult<AssembledBlob> {
        let output_name = format!("assembled-{}", Uuid::new_v4().simple());
        let mut writer = self
            .scratch
            .open_writer(upload_id, &output_name)
            .await
            .map_err(UploadServiceError::storage("creating assembled file"))?;

        let mut written = Ok(());
        for index in 0..total_chunks {
            let chunk_name = chunk_blob_name(index);
            written = match self.scratch.read_blob(upload_id, &chunk_name).await {
                Ok(Some(data)) => writer
                    .append(&data)
                    .await
                    .map_err(UploadServiceError::storage("writing assembled file")),
                Ok(None) => Err(UploadServiceError::MissingChunk {
                    position: index + 1,
                    total_chunks,
                }),
                Err(source) => Err(UploadServiceError::ChunkUnreadable {
                    position: index + 1,
                    total_chunks,
                    source,
                }),
            };
            if written.is_err() {
                break;
            }
            if self.config.eager_chunk_release {
                self.delete_blob_quietly(upload_id, &chunk_name).await;
            }
        }

        let assembled = match written {
            Ok(()) => writer
                .finish()
                .await
                .map_err(UploadServiceError::storage("flushing assembled file")),
            Err(e) => Err(e),
        };
        drop(writer);

        let assembled = match assembled {
            Ok(assembled) => assembled,
            Err(e) => {
                self.delete_blob_quietly(upload_id, &output_name).await;
                return Err(e);
            }
        };

        if !self.config.eager_chunk_release {
            for index in 0..total_chunks {
                self.delete_blob_quietly(upload_id, &chunk_blob_name(index))
                    .await;
            }
        }
        Ok(assembled)
    }

    /// Check the assembled size and hand the file to the media store.
    async fn commit(
        &self,
        upload_id: &UploadId,
        assembled: &AssembledBlob,
        target: FinalizeTarget,
    ) -> UploadServiceResult<MediaRecord> {
        if let Some(declared) = target.declared_size {
            if declared != assembled.size {
                warn!(
                    upload_id = %upload_id,
                    declared,
                    actual = assembled.size,
                    "assembled size differs from declared size"
                );
                if self.config.verify_declared_size {
                    return Err(UploadServiceError::SizeMismatch {
                        declared,
                        actual: assembled.size,
                    });
                }
            }
        }

        let provider =
            self.resolve_provider(&target.content_type, target.provider.as_deref(), &target.context);
        let stored = self
            .media
            .create_media(NewMedia {
                source: MediaSource::File(assembled.path.clone()),
                name: target.name,
                content_type: target.content_type.to_string(),
                context: target.context,
                provider,
            })
            .await?;

        info!(
            upload_id = %upload_id,
            media_id = stored.id,
            size = assembled.size,
            "finalized chunked upload"
        );
        Ok(MediaRecord {
            size: target.declared_size.unwrap_or(assembled.size),
            ..MediaRecord::from(stored)
        })
    }
}
