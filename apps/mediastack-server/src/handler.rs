//! Upload handler implementation for [`MediaUploader`].
//!
//! This module bridges the HTTP layer (`mediastack-upload-http`) with the
//! upload service (`mediastack-upload-core`) by implementing the
//! [`UploadHandler`] trait. Each decoded request is passed to the matching
//! [`MediaUploader`] operation and the output serialized with
//! [`IntoUploadResponse`].

use mediastack_upload_core::{MediaUploader, UploadServiceResult};
use mediastack_upload_http::body::UploadResponseBody;
use mediastack_upload_http::dispatch::{HandlerFuture, UploadHandler};
use mediastack_upload_http::request::UploadRequest;
use mediastack_upload_http::response::IntoUploadResponse;
use mediastack_upload_model::error::UploadError;

/// Wrapper that implements [`UploadHandler`] by delegating to [`MediaUploader`].
#[derive(Debug, Clone)]
pub struct MediaUploadHandler(pub MediaUploader);

impl UploadHandler for MediaUploadHandler {
    fn handle_request(&self, request: UploadRequest) -> HandlerFuture {
        let uploader = self.0.clone();
        Box::pin(async move {
            match request {
                UploadRequest::Chunk(input) => respond(uploader.receive_chunk(input).await),
                UploadRequest::Finalize(input) => respond(uploader.finalize_upload(input).await),
                UploadRequest::Files(input) => {
                    uploader.upload_files(input).await.into_upload_response()
                }
                UploadRequest::Status(input) => respond(uploader.upload_status(input).await),
                UploadRequest::Abort(input) => respond(uploader.abort_upload(input).await),
            }
        })
    }
}

fn respond<T: IntoUploadResponse>(
    result: UploadServiceResult<T>,
) -> Result<http::Response<UploadResponseBody>, UploadError> {
    result.map_err(UploadError::from)?.into_upload_response()
}
