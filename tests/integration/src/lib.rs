//! Integration tests for MediaStack server.
//!
//! These tests require a running MediaStack server at `localhost:4580`.
//! They are marked `#[ignore]` so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p mediastack-integration -- --ignored
//! ```

use std::sync::Once;

use reqwest::multipart::{Form, Part};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
fn endpoint_url() -> String {
    std::env::var("MEDIASTACK_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4580".to_owned())
}

/// URL of the upload endpoint, optionally followed by a session id.
#[must_use]
pub fn upload_url(upload_id: Option<&str>) -> String {
    let base = format!("{}/media/upload", endpoint_url());
    match upload_id {
        Some(id) => format!("{base}/{id}"),
        None => base,
    }
}

/// URL of the health endpoint.
#[must_use]
pub fn health_url() -> String {
    format!("{}/health", endpoint_url())
}

/// Create an HTTP client for the local server.
#[must_use]
pub fn http_client() -> reqwest::Client {
    init_tracing();
    reqwest::Client::new()
}

/// Generate a unique upload id for a test.
#[must_use]
pub fn test_upload_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string()[..12].to_owned();
    format!("test-{prefix}-{id}")
}

/// A finished response: status and decoded JSON body.
#[derive(Debug)]
pub struct JsonResponse {
    /// HTTP status.
    pub status: reqwest::StatusCode,
    /// Decoded body.
    pub body: serde_json::Value,
}

async fn into_json(resp: reqwest::Response) -> JsonResponse {
    let status = resp.status();
    let body = resp
        .json()
        .await
        .unwrap_or_else(|e| panic!("response body is not JSON: {e}"));
    JsonResponse { status, body }
}

/// Upload one chunk of a session.
pub async fn send_chunk(
    client: &reqwest::Client,
    upload_id: &str,
    index: u32,
    total: u32,
    data: &[u8],
) -> JsonResponse {
    let form = Form::new()
        .text("chunk", "1")
        .text("uploadId", upload_id.to_owned())
        .text("chunkIndex", index.to_string())
        .text("totalChunks", total.to_string())
        .part("file", Part::bytes(data.to_vec()).file_name("blob"));
    let resp = client
        .post(upload_url(None))
        .multipart(form)
        .send()
        .await
        .unwrap_or_else(|e| panic!("chunk {index} of {upload_id} failed to send: {e}"));
    into_json(resp).await
}

/// Finalize a session with a urlencoded form.
pub async fn finalize(
    client: &reqwest::Client,
    upload_id: &str,
    total: u32,
    file_name: &str,
    file_type: &str,
) -> JsonResponse {
    let total = total.to_string();
    let body = form_urlencoded::Serializer::new(String::new())
        .extend_pairs([
            ("finalize", "1"),
            ("uploadId", upload_id),
            ("totalChunks", total.as_str()),
            ("fileName", file_name),
            ("fileType", file_type),
        ])
        .finish();
    let resp = client
        .post(upload_url(None))
        .header(
            reqwest::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(body)
        .send()
        .await
        .unwrap_or_else(|e| panic!("finalize of {upload_id} failed to send: {e}"));
    into_json(resp).await
}

/// Upload whole files in one request.
pub async fn send_files(
    client: &reqwest::Client,
    files: &[(&str, &str, &[u8])],
) -> JsonResponse {
    // File names are sent verbatim so the server sees what a browser would send.
    let mut form = Form::new().percent_encode_noop().text("context", "default");
    for (name, content_type, data) in files {
        let part = Part::bytes(data.to_vec())
            .file_name((*name).to_owned())
            .mime_str(content_type)
            .unwrap_or_else(|e| panic!("invalid mime {content_type}: {e}"));
        form = form.part("files[]", part);
    }
    let resp = client
        .post(upload_url(None))
        .multipart(form)
        .send()
        .await
        .unwrap_or_else(|e| panic!("single-shot upload failed to send: {e}"));
    into_json(resp).await
}

/// Fetch the progress report of a session.
pub async fn session_status(client: &reqwest::Client, upload_id: &str) -> JsonResponse {
    let resp = client
        .get(upload_url(Some(upload_id)))
        .send()
        .await
        .unwrap_or_else(|e| panic!("status of {upload_id} failed to send: {e}"));
    into_json(resp).await
}

/// Abort a session.
pub async fn abort(client: &reqwest::Client, upload_id: &str) -> JsonResponse {
    let resp = client
        .delete(upload_url(Some(upload_id)))
        .send()
        .await
        .unwrap_or_else(|e| panic!("abort of {upload_id} failed to send: {e}"));
    into_json(resp).await
}

/// Fetch the bytes of a published media file.
///
/// Only meaningful when `MEDIA_PUBLIC_URL` points at something serving the
/// media directory; returns `None` otherwise.
pub async fn fetch_media(client: &reqwest::Client, url: &str) -> Option<Vec<u8>> {
    if !url.starts_with("http") {
        return None;
    }
    let resp = client.get(url).send().await.ok()?;
    if !resp.status().is_success() {
        return None;
    }
    resp.bytes().await.ok().map(|b| b.to_vec())
}

mod test_chunked;
mod test_errors;
mod test_session;
mod test_single_shot;
