//! Upload request dispatch: hands a decoded request to the business logic handler.

use std::future::Future;
use std::pin::Pin;

use mediastack_upload_model::error::UploadError;

use crate::body::UploadResponseBody;
use crate::request::UploadRequest;

/// Future returned by [`UploadHandler::handle_request`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<UploadResponseBody>, UploadError>> + Send>>;

/// Trait that the business logic provider must implement.
///
/// This is the boundary between the HTTP layer and the upload service. The
/// implementor receives a fully decoded request and returns a complete HTTP
/// response, typically built with
/// [`IntoUploadResponse`](crate::response::IntoUploadResponse).
pub trait UploadHandler: Send + Sync + 'static {
    /// Handle an upload request and produce an HTTP response.
    fn handle_request(&self, request: UploadRequest) -> HandlerFuture;
}

/// Dispatch a decoded request to the handler.
pub async fn dispatch_request<H: UploadHandler>(
    handler: &H,
    request: UploadRequest,
) -> Result<http::Response<UploadResponseBody>, UploadError> {
    tracing::debug!(
        operation = %request.operation(),
        upload_id = ?request.upload_id(),
        "dispatching upload request"
    );
    handler.handle_request(request).await
}
