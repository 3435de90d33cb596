//! HTTP request to typed upload input decoding.
//!
//! [`decode_request`] turns a routed request and its collected body into an
//! [`UploadRequest`]. `POST` bodies are read as `multipart/form-data` or
//! `application/x-www-form-urlencoded`; the `finalize` and `chunk` flags pick
//! the operation, and a plain form falls through to a single-shot upload.
//! Flags accept `1` or `true` in any case.

use std::collections::HashMap;

use bytes::Bytes;
use mediastack_upload_model::error::{UploadError, UploadErrorCode};
use mediastack_upload_model::input::{
    AbortUploadInput, FilePart, FinalizeUploadInput, GetUploadStatusInput, UploadChunkInput,
    UploadFilesInput,
};
use mediastack_upload_model::operations::UploadOperation;

use crate::multipart::{extract_boundary, parse_multipart};
use crate::router::RoutingContext;

/// A fully decoded upload request.
#[derive(Debug, Clone)]
pub enum UploadRequest {
    /// Store one chunk.
    Chunk(UploadChunkInput),
    /// Assemble a session.
    Finalize(FinalizeUploadInput),
    /// Store whole files.
    Files(UploadFilesInput),
    /// Report session progress.
    Status(GetUploadStatusInput),
    /// Discard a session.
    Abort(AbortUploadInput),
}

impl UploadRequest {
    /// The operation this request performs.
    #[must_use]
    pub fn operation(&self) -> UploadOperation {
        match self {
            Self::Chunk(_) => UploadOperation::UploadChunk,
            Self::Finalize(_) => UploadOperation::FinalizeUpload,
            Self::Files(_) => UploadOperation::UploadFiles,
            Self::Status(_) => UploadOperation::GetUploadStatus,
            Self::Abort(_) => UploadOperation::AbortUpload,
        }
    }

    /// The session the request addresses, if any.
    #[must_use]
    pub fn upload_id(&self) -> Option<&str> {
        match self {
            Self::Chunk(input) => Some(&input.upload_id),
            Self::Finalize(input) => Some(&input.upload_id),
            Self::Status(input) => Some(&input.upload_id),
            Self::Abort(input) => Some(&input.upload_id),
            Self::Files(_) => None,
        }
    }

    /// The client-supplied file name of a finalize request.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Finalize(input) => input.file_name.as_deref(),
            _ => None,
        }
    }
}

/// Form fields and file parts of a `POST` body.
#[derive(Debug, Default)]
struct SubmittedForm {
    fields: HashMap<String, String>,
    files: Vec<FilePart>,
}

impl SubmittedForm {
    /// A non-empty text field.
    fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }

    fn required_text(&self, name: &str) -> Result<String, UploadError> {
        self.text(name).ok_or_else(|| missing_field(name))
    }

    fn flag(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|v| is_truthy(v))
    }

    fn int(&self, name: &str) -> Result<Option<i64>, UploadError> {
        self.text(name).map(|v| parse_int(name, &v)).transpose()
    }

    fn required_int(&self, name: &str) -> Result<i64, UploadError> {
        self.int(name)?.ok_or_else(|| missing_field(name))
    }

    fn size(&self, name: &str) -> Result<Option<u64>, UploadError> {
        self.text(name)
            .map(|v| {
                v.parse::<u64>().map_err(|_| {
                    UploadError::invalid_argument(format!(
                        "Field {name} must be a non-negative integer, got: {v}"
                    ))
                })
            })
            .transpose()
    }
}

/// Decode a routed request into a typed [`UploadRequest`].
///
/// # Errors
///
/// Returns `UnsupportedMediaType` for a `POST` body that is not a form,
/// `MalformedRequest` for an undecodable body, and `InvalidArgument` for a
/// missing or non-numeric required field.
pub fn decode_request(
    parts: &http::request::Parts,
    body: &Bytes,
    ctx: &RoutingContext,
) -> Result<UploadRequest, UploadError> {
    match ctx.operation {
        UploadOperation::GetUploadStatus => {
            let total_chunks = ctx
                .query_value("totalChunks")
                .filter(|v| !v.is_empty())
                .map(|v| parse_int("totalChunks", v))
                .transpose()?;
            Ok(UploadRequest::Status(GetUploadStatusInput {
                upload_id: path_upload_id(ctx),
                total_chunks,
            }))
        }
        UploadOperation::AbortUpload => Ok(UploadRequest::Abort(AbortUploadInput {
            upload_id: path_upload_id(ctx),
        })),
        UploadOperation::UploadChunk
        | UploadOperation::FinalizeUpload
        | UploadOperation::UploadFiles => decode_submission(read_form(parts, body)?),
    }
}

fn decode_submission(form: SubmittedForm) -> Result<UploadRequest, UploadError> {
    if form.flag("finalize") {
        return Ok(UploadRequest::Finalize(FinalizeUploadInput {
            upload_id: form.required_text("uploadId")?,
            total_chunks: form.required_int("totalChunks")?,
            file_name: form.text("fileName"),
            file_size: form.size("fileSize")?,
            file_type: form.text("fileType"),
            context: form.text("context"),
            provider: form.text("provider"),
        }));
    }

    if form.flag("chunk") {
        let upload_id = form.required_text("uploadId")?;
        let chunk_index = form.required_int("chunkIndex")?;
        let total_chunks = form.required_int("totalChunks")?;
        return Ok(UploadRequest::Chunk(UploadChunkInput {
            upload_id,
            chunk_index,
            total_chunks,
            chunk: form.files.into_iter().next(),
        }));
    }

    let context = form.text("context");
    let provider = form.text("provider");
    Ok(UploadRequest::Files(UploadFilesInput {
        files: form.files,
        context,
        provider,
    }))
}

/// Read a `POST` body as a multipart or urlencoded form.
fn read_form(parts: &http::request::Parts, body: &Bytes) -> Result<SubmittedForm, UploadError> {
    let content_type = parts
        .headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            UploadError::with_message(
                UploadErrorCode::UnsupportedMediaType,
                "Missing Content-Type; expected multipart/form-data or application/x-www-form-urlencoded",
            )
        })?;

    let parsed: mime::Mime = content_type.parse().map_err(|_| {
        UploadError::malformed(format!("Invalid Content-Type header: {content_type}"))
    })?;

    if parsed.type_() == mime::MULTIPART && parsed.subtype() == mime::FORM_DATA {
        let boundary = extract_boundary(content_type)?;
        let form = parse_multipart(body, &boundary)?;
        return Ok(SubmittedForm {
            fields: form.fields,
            files: form.files,
        });
    }

    if parsed.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
        let fields = form_urlencoded::parse(body).into_owned().collect();
        return Ok(SubmittedForm {
            fields,
            files: Vec::new(),
        });
    }

    Err(UploadError::with_message(
        UploadErrorCode::UnsupportedMediaType,
        format!(
            "Unsupported Content-Type {content_type}; expected multipart/form-data or application/x-www-form-urlencoded"
        ),
    ))
}

fn path_upload_id(ctx: &RoutingContext) -> String {
    ctx.upload_id.clone().unwrap_or_default()
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn parse_int(name: &str, value: &str) -> Result<i64, UploadError> {
    value.trim().parse::<i64>().map_err(|_| {
        UploadError::invalid_argument(format!("Field {name} must be an integer, got: {value}"))
    })
}

fn missing_field(name: &str) -> UploadError {
    UploadError::invalid_argument(format!("Missing required field: {name}"))
}
