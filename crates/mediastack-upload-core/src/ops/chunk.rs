//! Chunk receiver.

use mediastack_upload_model::input::UploadChunkInput;
use mediastack_upload_model::output::ChunkReceipt;
use tracing::debug;

use crate::error::{UploadServiceError, UploadServiceResult};
use crate::provider::MediaUploader;
use crate::scratch::chunk_blob_name;
use crate::validation::{validate_chunk_index, validate_total_chunks};

impl MediaUploader {
    /// Store one chunk of an upload session.
    ///
    /// All validation happens before any scratch I/O. Re-sending an index
    /// replaces the stored chunk.
    pub async fn receive_chunk(&self, input: UploadChunkInput) -> UploadServiceResult<ChunkReceipt> {
        let upload_id = self.parse_upload_id(&input.upload_id)?;
        let total_chunks = validate_total_chunks(input.total_chunks, self.config.max_total_chunks)?;
        let chunk_index = validate_chunk_index(input.chunk_index, total_chunks)?;
        let payload = input.chunk.ok_or(UploadServiceError::MissingChunkPayload)?;
        let size = payload.len();
        if size > self.config.max_chunk_size {
            return Err(UploadServiceError::ChunkTooLarge {
                size,
                max: self.config.max_chunk_size,
            });
        }

        self.check_pinned_total(&upload_id, total_chunks).await?;
        self.scratch
            .ensure_session(&upload_id)
            .await
            .map_err(UploadServiceError::storage("creating session directory"))?;
        self.pin_total_chunks(&upload_id, total_chunks).await?;

        let name = chunk_blob_name(chunk_index);
        self.scratch
            .write_blob(&upload_id, &name, payload.data)
            .await
            .map_err(UploadServiceError::storage("writing chunk"))?;

        let stored = self
            .scratch
            .blob_len(&upload_id, &name)
            .await
            .map_err(UploadServiceError::storage("verifying chunk"))?;
        if stored != Some(size) {
            return Err(UploadServiceError::storage("verifying chunk")(
                std::io::Error::other(format!(
                    "chunk {chunk_index} reads back as {stored:?} bytes, expected {size}"
                )),
            ));
        }

        let progress = self.scan_chunks(&upload_id, total_chunks).await?;
        debug!(
            upload_id = %upload_id,
            chunk_index,
            total_chunks,
            size,
            uploaded = progress.present,
            "stored chunk"
        );

        Ok(ChunkReceipt {
            success: true,
            chunk_index,
            total_chunks,
            uploaded_chunks: progress.present,
            received_bytes: progress.bytes,
        })
    }
}
