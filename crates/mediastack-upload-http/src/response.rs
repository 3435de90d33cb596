//! Upload output to HTTP response serialization.
//!
//! Every response body is JSON. Outputs implement [`IntoUploadResponse`];
//! errors take one of two shapes:
//!
//! - `{"error": "...", "code": "..."}` for chunk, status, abort and
//!   request-level failures ([`error_to_response`]).
//! - `{"files": [{"name": "...", "error": "..."}]}` for a failed finalize, so
//!   clients read finalize results from one field ([`finalize_error_response`]).

use mediastack_upload_model::error::UploadError;
use mediastack_upload_model::output::{
    AbortUploadOutput, ChunkReceipt, FileEntry, FilesOutput, MediaRecord, SessionStatus,
};
use serde::Serialize;

use crate::body::UploadResponseBody;

/// Trait for converting an upload output into an HTTP response.
pub trait IntoUploadResponse {
    /// Convert this output into an HTTP response.
    ///
    /// # Errors
    ///
    /// Returns an `UploadError` if the body cannot be serialized.
    fn into_upload_response(self) -> Result<http::Response<UploadResponseBody>, UploadError>;
}

/// Serialize `value` as a JSON response with the given status.
///
/// # Errors
///
/// Returns `InternalError` if serialization fails.
pub fn json_response<T: Serialize>(
    status: http::StatusCode,
    value: &T,
) -> Result<http::Response<UploadResponseBody>, UploadError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| UploadError::internal("Failed to serialize response").with_source(e))?;
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(UploadResponseBody::from_json(json))
        .map_err(|e| UploadError::internal("Failed to build response").with_source(e))
}

impl IntoUploadResponse for ChunkReceipt {
    fn into_upload_response(self) -> Result<http::Response<UploadResponseBody>, UploadError> {
        json_response(http::StatusCode::OK, &self)
    }
}

impl IntoUploadResponse for FilesOutput {
    fn into_upload_response(self) -> Result<http::Response<UploadResponseBody>, UploadError> {
        json_response(http::StatusCode::OK, &self)
    }
}

impl IntoUploadResponse for MediaRecord {
    fn into_upload_response(self) -> Result<http::Response<UploadResponseBody>, UploadError> {
        FilesOutput {
            files: vec![FileEntry::Uploaded(self)],
        }
        .into_upload_response()
    }
}

impl IntoUploadResponse for SessionStatus {
    fn into_upload_response(self) -> Result<http::Response<UploadResponseBody>, UploadError> {
        json_response(http::StatusCode::OK, &self)
    }
}

impl IntoUploadResponse for AbortUploadOutput {
    fn into_upload_response(self) -> Result<http::Response<UploadResponseBody>, UploadError> {
        json_response(http::StatusCode::OK, &self)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'a str,
}

/// Convert an [`UploadError`] into a `{error, code}` JSON response.
#[must_use]
pub fn error_to_response(err: &UploadError, request_id: &str) -> http::Response<UploadResponseBody> {
    let body = ErrorBody {
        error: &err.message,
        code: err.code.as_str(),
    };
    fallback_on_failure(json_response(err.status_code, &body), request_id)
}

/// Convert a finalize failure into a `{files: [{name, error}]}` JSON response
/// carrying the error's status code.
#[must_use]
pub fn finalize_error_response(
    err: &UploadError,
    file_name: &str,
    request_id: &str,
) -> http::Response<UploadResponseBody> {
    let body = FilesOutput {
        files: vec![FileEntry::failed(file_name, err.message.clone())],
    };
    fallback_on_failure(json_response(err.status_code, &body), request_id)
}

fn fallback_on_failure(
    result: Result<http::Response<UploadResponseBody>, UploadError>,
    request_id: &str,
) -> http::Response<UploadResponseBody> {
    result.unwrap_or_else(|e| {
        tracing::error!(error = %e, request_id, "failed to serialize error response");
        http::Response::builder()
            .status(http::StatusCode::INTERNAL_SERVER_ERROR)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(UploadResponseBody::from_string(
                r#"{"error":"Internal server error","code":"InternalError"}"#,
            ))
            .expect("static error response should be valid")
    })
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use mediastack_upload_model::error::UploadErrorCode;

    use super::*;

    async fn body_json(resp: http::Response<UploadResponseBody>) -> serde_json::Value {
        let bytes = resp
            .into_body()
            .collect()
            .await
            .unwrap_or_else(|e| panic!("collect failed: {e}"))
            .to_bytes();
        serde_json::from_slice(&bytes).unwrap_or_else(|e| panic!("invalid json: {e}"))
    }

    #[tokio::test]
    async fn test_should_serialize_chunk_receipt() {
        let resp = ChunkReceipt {
            success: true,
            chunk_index: 1,
            total_chunks: 3,
            uploaded_chunks: 2,
            received_bytes: 10,
        }
        .into_upload_response()
        .expect("valid response");
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/json"),
        );
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["uploadedChunks"], 2);
        assert_eq!(json["receivedBytes"], 10);
    }

    #[tokio::test]
    async fn test_should_wrap_media_record_in_files_list() {
        let resp = MediaRecord {
            id: 7,
            name: "clip.mp4".to_owned(),
            url: "/uploads/media/default/x.mp4".to_owned(),
            path: "default/x.mp4".to_owned(),
            size: 3,
            content_type: "video/mp4".to_owned(),
        }
        .into_upload_response()
        .expect("valid response");
        let json = body_json(resp).await;
        assert_eq!(json["files"][0]["id"], 7);
        assert_eq!(json["files"][0]["type"], "video/mp4");
    }

    #[tokio::test]
    async fn test_should_render_error_with_code() {
        let err = UploadError::with_message(UploadErrorCode::ChunkIndexOutOfRange, "bad index");
        let resp = error_to_response(&err, "req-1");
        assert_eq!(resp.status(), http::StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "bad index");
        assert_eq!(json["code"], "ChunkIndexOutOfRange");
    }

    #[tokio::test]
    async fn test_should_render_finalize_error_as_file_entry() {
        let err = UploadError::with_message(UploadErrorCode::MissingChunk, "Missing chunk 2 of 3");
        let resp = finalize_error_response(&err, "clip.mp4", "req-1");
        assert_eq!(resp.status(), http::StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(
            json,
            serde_json::json!({"files": [{"name": "clip.mp4", "error": "Missing chunk 2 of 3"}]})
        );
    }
}
