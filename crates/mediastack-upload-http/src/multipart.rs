//! Multipart form-data parser for upload submissions.
//!
//! Parses `multipart/form-data` bodies into text fields and any number of
//! file parts. A part is a file when its `Content-Disposition` carries a
//! `filename` parameter; everything else is a text field. This is a
//! synchronous parser that works on the already-collected body bytes.

use std::collections::HashMap;

use bytes::Bytes;
use mediastack_upload_model::error::{UploadError, UploadErrorCode};
use mediastack_upload_model::input::FilePart;

/// A parsed multipart form-data submission.
#[derive(Debug, Default)]
pub struct MultipartForm {
    /// Text fields (name → value). A repeated name keeps its last value.
    pub fields: HashMap<String, String>,
    /// File parts in body order.
    pub files: Vec<FilePart>,
}

/// Extract the boundary string from a `Content-Type: multipart/form-data; boundary=...` header.
///
/// # Errors
///
/// Returns `UnsupportedMediaType` if the content type is not
/// multipart/form-data, or `MalformedRequest` if the boundary parameter is
/// absent or empty.
pub fn extract_boundary(content_type: &str) -> Result<String, UploadError> {
    if !content_type
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
    {
        return Err(UploadError::with_message(
            UploadErrorCode::UnsupportedMediaType,
            format!("Expected multipart/form-data, got: {content_type}"),
        ));
    }

    for param in content_type.split(';').skip(1) {
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("boundary") {
            let boundary = value.trim().trim_matches('"');
            if boundary.is_empty() {
                return Err(UploadError::malformed("Empty boundary in Content-Type"));
            }
            return Ok(boundary.to_owned());
        }
    }

    Err(UploadError::malformed("Missing boundary in Content-Type"))
}

/// Parse a multipart/form-data body into text fields and file parts.
///
/// # Errors
///
/// Returns `MalformedRequest` if the body does not contain the boundary
/// delimiter at all.
pub fn parse_multipart(body: &Bytes, boundary: &str) -> Result<MultipartForm, UploadError> {
    let delimiter = format!("--{boundary}");
    let end_delimiter = format!("--{boundary}--");

    if find_bytes(body, delimiter.as_bytes()).is_none() {
        return Err(UploadError::malformed(
            "Multipart body does not contain the declared boundary",
        ));
    }

    let mut form = MultipartForm::default();
    for range in split_multipart_parts(body, delimiter.as_bytes(), end_delimiter.as_bytes()) {
        let part = &body[range.clone()];
        let Some((headers_len, body_start)) = split_headers_body(part) else {
            continue;
        };
        let headers = &part[..headers_len];

        let disposition = parse_content_disposition(headers);
        let Some(field_name) = disposition.name else {
            continue;
        };

        let data_range = range.start + body_start..range.end;
        match disposition.filename {
            // Browsers send an empty filename for an untouched file input.
            Some(file_name) if file_name.is_empty() && data_range.is_empty() => {}
            Some(file_name) => form.files.push(FilePart {
                field_name,
                file_name: Some(file_name).filter(|n| !n.is_empty()),
                content_type: parse_part_content_type(headers),
                data: body.slice(data_range),
            }),
            None => {
                let value = String::from_utf8_lossy(&body[data_range]).into_owned();
                form.fields.insert(field_name, value);
            }
        }
    }

    Ok(form)
}

/// Split the multipart body into byte ranges of the individual parts.
fn split_multipart_parts(
    body: &[u8],
    delimiter: &[u8],
    end_delimiter: &[u8],
) -> Vec<std::ops::Range<usize>> {
    let mut parts = Vec::new();

    // Skip the preamble (everything before the first delimiter).
    let Some(first) = find_bytes(body, delimiter) else {
        return parts;
    };
    let mut offset = skip_crlf(body, first + delimiter.len());

    loop {
        let remaining = &body[offset..];
        if remaining.starts_with(b"--") || remaining.is_empty() {
            break;
        }

        if let Some(pos) = find_bytes(remaining, delimiter) {
            let end = strip_trailing_crlf(body, offset, offset + pos);
            parts.push(offset..end);
            if body[offset + pos..].starts_with(end_delimiter) {
                break;
            }
            offset = skip_crlf(body, offset + pos + delimiter.len());
        } else {
            // Truncated body without a closing delimiter: keep what arrived.
            let end = strip_trailing_crlf(body, offset, body.len());
            if end > offset {
                parts.push(offset..end);
            }
            break;
        }
    }

    parts
}

/// Locate the blank line separating part headers from the part body.
///
/// Returns the length of the headers section and the offset of the body.
fn split_headers_body(part: &[u8]) -> Option<(usize, usize)> {
    let separator = b"\r\n\r\n";
    find_bytes(part, separator).map(|pos| (pos, pos + separator.len()))
}

/// Parsed Content-Disposition header fields.
#[derive(Debug, Default, PartialEq, Eq)]
struct ContentDisposition {
    name: Option<String>,
    filename: Option<String>,
}

/// Parse the Content-Disposition header from a part's headers section.
fn parse_content_disposition(headers: &[u8]) -> ContentDisposition {
    let headers_str = String::from_utf8_lossy(headers);
    let mut disposition = ContentDisposition::default();

    for line in headers_str.split("\r\n") {
        let Some((header, value)) = line.split_once(':') else {
            continue;
        };
        if !header.trim().eq_ignore_ascii_case("content-disposition") {
            continue;
        }

        for param in split_params(value).into_iter().skip(1) {
            let Some((key, raw)) = param.split_once('=') else {
                continue;
            };
            let value = unquote(raw.trim());
            match key.trim().to_ascii_lowercase().as_str() {
                "name" => disposition.name = Some(value),
                "filename" => disposition.filename = Some(value),
                _ => {}
            }
        }
    }

    disposition
}

/// Split a header value on `;`, ignoring separators inside quoted strings.
fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(value[start..].trim());
    params
}

/// Strip surrounding quotes and backslash escapes from a parameter value.
fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_owned();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Extract the Content-Type from a part's headers section.
fn parse_part_content_type(headers: &[u8]) -> Option<String> {
    let headers_str = String::from_utf8_lossy(headers);
    headers_str.split("\r\n").find_map(|line| {
        let (header, value) = line.split_once(':')?;
        header
            .trim()
            .eq_ignore_ascii_case("content-type")
            .then(|| value.trim().to_owned())
            .filter(|v| !v.is_empty())
    })
}

/// Find the position of a needle in a haystack.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Advance past a `\r\n` at `offset`, if present.
fn skip_crlf(data: &[u8], offset: usize) -> usize {
    if data[offset..].starts_with(b"\r\n") {
        offset + 2
    } else {
        offset
    }
}

/// Pull `end` back over a `\r\n` that immediately precedes it.
fn strip_trailing_crlf(data: &[u8], start: usize, end: usize) -> usize {
    if end >= start + 2 && &data[end - 2..end] == b"\r\n" {
        end - 2
    } else {
        end
    }
}
