//! Request validation helpers.
//!
//! Everything here runs before the service touches scratch storage, so a
//! rejected request has no filesystem side effects.

use mediastack_core::{IdPattern, UploadId};

use crate::error::{UploadServiceError, UploadServiceResult};

/// Display name used when a client supplies none, or only unusable characters.
pub const FALLBACK_FILE_NAME: &str = "upload";

/// Longest display name kept, in bytes.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// Validate an upload id against the path guard and the configured pattern.
pub fn validate_upload_id(raw: &str, pattern: &IdPattern) -> UploadServiceResult<UploadId> {
    Ok(UploadId::parse(raw, pattern)?)
}

/// Validate a declared chunk count, returning it as `u32`.
pub fn validate_total_chunks(total_chunks: i64, max: u32) -> UploadServiceResult<u32> {
    u32::try_from(total_chunks)
        .ok()
        .filter(|n| (1..=max).contains(n))
        .ok_or(UploadServiceError::InvalidTotalChunks { total_chunks, max })
}

/// Validate a chunk index against an already validated chunk count.
pub fn validate_chunk_index(chunk_index: i64, total_chunks: u32) -> UploadServiceResult<u32> {
    u32::try_from(chunk_index)
        .ok()
        .filter(|i| *i < total_chunks)
        .ok_or(UploadServiceError::ChunkIndexOutOfRange {
            chunk_index,
            total_chunks,
        })
}

/// Reduce a client-supplied file name to a safe display name.
///
/// Keeps only the last path component (either separator), drops NUL and
/// other control characters, trims surrounding whitespace, and caps the
/// length at [`MAX_FILE_NAME_LEN`] bytes. Falls back to
/// [`FALLBACK_FILE_NAME`] when nothing usable remains.
///
/// # Examples
///
/// ```
/// use mediastack_upload_core::validation::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
/// assert_eq!(sanitize_file_name("C:\\photos\\cat.png"), "cat.png");
/// assert_eq!(sanitize_file_name(".."), "upload");
/// ```
#[must_use]
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return FALLBACK_FILE_NAME.to_owned();
    }

    let mut end = cleaned.len().min(MAX_FILE_NAME_LEN);
    while !cleaned.is_char_boundary(end) {
        end -= 1;
    }
    cleaned[..end].to_owned()
}

/// Parse a declared MIME type, falling back to `application/octet-stream`.
#[must_use]
pub fn resolve_content_type(raw: Option<&str>) -> mime::Mime {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<mime::Mime>().ok())
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

/// Return `value` if it is non-blank, else `fallback`.
pub(crate) fn or_default(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_owned()
}
