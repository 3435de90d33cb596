//! The upload HTTP service implementing hyper's `Service` trait.
//!
//! [`UploadHttpService`] ties together routing, form decoding, dispatch and
//! response serialization. Each request goes through:
//!
//! 1. Health check interception (`GET /health`, `GET /_health`)
//! 2. CORS preflight requests (`OPTIONS`)
//! 3. Routing via [`UploadRouter`]
//! 4. Body collection, bounded by [`UploadHttpConfig::max_body_size`]
//! 5. Request decoding into an [`UploadRequest`](crate::request::UploadRequest)
//! 6. Dispatch to the [`UploadHandler`]
//! 7. Common response headers (`x-request-id`, `Server`, CORS)

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::service::Service;
use mediastack_upload_model::error::{UploadError, UploadErrorCode};
use mediastack_upload_model::operations::UploadOperation;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::body::UploadResponseBody;
use crate::dispatch::{UploadHandler, dispatch_request};
use crate::request::decode_request;
use crate::response::{error_to_response, finalize_error_response};
use crate::router::{DEFAULT_BASE_PATH, UploadRouter};

/// Default request body limit: 128 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 128 * 1024 * 1024;

/// Configuration for the upload HTTP service.
#[derive(Debug, Clone)]
pub struct UploadHttpConfig {
    /// Mount point of the upload endpoint.
    pub base_path: String,
    /// Largest accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for UploadHttpConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_owned(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl UploadHttpConfig {
    /// Load the HTTP configuration from `UPLOAD_BASE_PATH` and
    /// `UPLOAD_MAX_BODY_SIZE`, keeping defaults for unset or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = std::env::var("UPLOAD_BASE_PATH") {
            if !v.trim().is_empty() {
                config.base_path = v;
            }
        }
        if let Some(v) = std::env::var("UPLOAD_MAX_BODY_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.max_body_size = v;
        }
        config
    }
}

/// The upload HTTP service that implements hyper's `Service` trait.
///
/// # Type Parameters
///
/// - `H`: The business logic handler implementing [`UploadHandler`].
#[derive(Debug)]
pub struct UploadHttpService<H: UploadHandler> {
    handler: Arc<H>,
    router: UploadRouter,
    config: Arc<UploadHttpConfig>,
}

impl<H: UploadHandler> UploadHttpService<H> {
    /// Create a new upload HTTP service with the given handler and configuration.
    #[must_use]
    pub fn new(handler: H, config: UploadHttpConfig) -> Self {
        Self::from_shared(Arc::new(handler), config)
    }

    /// Create a new upload HTTP service from an `Arc<H>` handler and configuration.
    #[must_use]
    pub fn from_shared(handler: Arc<H>, config: UploadHttpConfig) -> Self {
        let router = UploadRouter::new(&config.base_path);
        Self {
            handler,
            router,
            config: Arc::new(config),
        }
    }

    /// Run one request through the full pipeline.
    ///
    /// Accepts any body type so the pipeline can be driven without a socket.
    pub async fn respond<B>(&self, req: http::Request<B>) -> http::Response<UploadResponseBody>
    where
        B: http_body::Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = Uuid::new_v4().to_string();
        let response = process_request(
            req,
            self.handler.as_ref(),
            &self.router,
            &self.config,
            &request_id,
        )
        .await;
        add_common_headers(response, &request_id)
    }
}

impl<H: UploadHandler> Clone for UploadHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            router: self.router.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: UploadHandler> Service<http::Request<Incoming>> for UploadHttpService<H> {
    type Response = http::Response<UploadResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.respond(req).await) })
    }
}

/// Process an incoming HTTP request through the upload pipeline.
async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    router: &UploadRouter,
    config: &UploadHttpConfig,
    request_id: &str,
) -> http::Response<UploadResponseBody>
where
    H: UploadHandler,
    B: http_body::Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, request_id, "processing upload request");

    // 1. Health check interception.
    if is_health_check(&method, uri.path()) {
        return health_check_response();
    }

    // 2. CORS preflight.
    if method == http::Method::OPTIONS {
        return cors_preflight_response();
    }

    // 3. Route the request.
    let ctx = match router.resolve(&req) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%method, %uri, error = %err, request_id, "failed to route upload request");
            return error_to_response(&err, request_id);
        }
    };

    // 4. Collect body within the configured limit.
    if declared_length(&req).is_some_and(|len| len > config.max_body_size as u64) {
        let err = body_too_large(config.max_body_size);
        warn!(%uri, error = %err, request_id, "rejected oversized request");
        return error_to_response(&err, request_id);
    }
    let (parts, body) = req.into_parts();
    let body = match Limited::new(body, config.max_body_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.is::<LengthLimitError>() => {
            let err = body_too_large(config.max_body_size);
            warn!(%uri, error = %err, request_id, "rejected oversized request");
            return error_to_response(&err, request_id);
        }
        Err(err) => {
            error!(error = %err, request_id, "failed to collect request body");
            let err = UploadError::internal("Failed to read request body");
            return error_to_response(&err, request_id);
        }
    };

    // 5. Decode the form into a typed request.
    let request = match decode_request(&parts, &body, &ctx) {
        Ok(request) => request,
        Err(err) => {
            warn!(%uri, error = %err, request_id, "failed to decode upload request");
            return error_to_response(&err, request_id);
        }
    };

    let operation = request.operation();
    let subject = request
        .file_name()
        .or_else(|| request.upload_id())
        .unwrap_or_default()
        .to_owned();
    info!(
        %operation,
        upload_id = ?request.upload_id(),
        size = body.len(),
        request_id,
        "routed upload request"
    );

    // 6. Dispatch to handler.
    match dispatch_request(handler, request).await {
        Ok(response) => response,
        Err(err) => {
            if err.is_client_error() {
                warn!(%operation, error = %err, request_id, "upload request rejected");
            } else {
                error!(%operation, error = %err, request_id, "upload request failed");
            }
            if operation == UploadOperation::FinalizeUpload {
                finalize_error_response(&err, &subject, request_id)
            } else {
                error_to_response(&err, request_id)
            }
        }
    }
}

fn declared_length<B>(req: &http::Request<B>) -> Option<u64> {
    req.headers()
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn body_too_large(max: usize) -> UploadError {
    UploadError::with_message(
        UploadErrorCode::EntityTooLarge,
        format!("Request body exceeds the maximum of {max} bytes"),
    )
}

/// Check if the request is a health check probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/health" || path == "/_health")
}

/// Produce a health check response.
fn health_check_response() -> http::Response<UploadResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(UploadResponseBody::from_string(
            r#"{"status":"running","service":"media-upload"}"#,
        ))
        .expect("static health response should be valid")
}

/// Produce a CORS preflight response.
fn cors_preflight_response() -> http::Response<UploadResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "*, Content-Type")
        .header("Access-Control-Max-Age", "86400")
        .body(UploadResponseBody::empty())
        .expect("static CORS response should be valid")
}

/// Add common response headers to every upload response.
fn add_common_headers(
    mut response: http::Response<UploadResponseBody>,
    request_id: &str,
) -> http::Response<UploadResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::header::HeaderValue::from_str(request_id) {
        headers.insert("x-request-id", hv);
    }
    headers.insert(
        "Server",
        http::header::HeaderValue::from_static("MediaStack"),
    );
    headers.insert(
        "Access-Control-Allow-Origin",
        http::header::HeaderValue::from_static("*"),
    );
    headers.insert(
        "Access-Control-Expose-Headers",
        http::header::HeaderValue::from_static("x-request-id"),
    );

    response
}
