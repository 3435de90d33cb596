//! Upload request routing.
//!
//! The [`UploadRouter`] maps incoming HTTP requests to upload operations by
//! method and path:
//!
//! | Method   | Path                 | Operation                                  |
//! |----------|----------------------|--------------------------------------------|
//! | `POST`   | `{base}`             | `UploadFiles`, refined by the form fields  |
//! | `GET`    | `{base}/{uploadId}`  | `GetUploadStatus`                          |
//! | `DELETE` | `{base}/{uploadId}`  | `AbortUpload`                              |
//!
//! A `POST` cannot be classified without its body: a `chunk` or `finalize`
//! form flag turns it into `UploadChunk` or `FinalizeUpload` during request
//! decoding.

use http::Method;
use mediastack_upload_model::error::{UploadError, UploadErrorCode};
use mediastack_upload_model::operations::UploadOperation;
use percent_encoding::percent_decode_str;

/// Default mount point of the upload endpoint.
pub const DEFAULT_BASE_PATH: &str = "/media/upload";

/// Routes requests under a base path.
#[derive(Debug, Clone)]
pub struct UploadRouter {
    base_path: String,
}

/// The result of routing an HTTP request to an upload operation.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// The identified operation.
    pub operation: UploadOperation,
    /// The upload identifier from the path, if any.
    pub upload_id: Option<String>,
    /// Parsed query parameters from the request URI.
    pub query_params: Vec<(String, String)>,
}

impl RoutingContext {
    /// Get the value of a query parameter by name.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl Default for UploadRouter {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_PATH)
    }
}

impl UploadRouter {
    /// Create a router mounted at `base_path`.
    ///
    /// Trailing slashes are ignored and a missing leading slash is added.
    #[must_use]
    pub fn new(base_path: impl AsRef<str>) -> Self {
        let trimmed = base_path.as_ref().trim_matches('/');
        Self {
            base_path: format!("/{trimmed}"),
        }
    }

    /// The normalized base path.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Resolve an HTTP request to a routing context.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for paths outside the upload endpoint and
    /// `MethodNotAllowed` for unsupported methods on a known path.
    pub fn resolve<B>(&self, req: &http::Request<B>) -> Result<RoutingContext, UploadError> {
        let uri = req.uri();
        let query_params = parse_query_params(uri.query().unwrap_or(""));

        let Some(target) = self.match_path(uri.path()) else {
            return Err(UploadError::with_message(
                UploadErrorCode::NotFound,
                format!("No upload endpoint at {}", uri.path()),
            ));
        };

        let method = req.method();
        let operation = match &target {
            PathTarget::Collection if *method == Method::POST => UploadOperation::UploadFiles,
            PathTarget::Session(_) if *method == Method::GET => UploadOperation::GetUploadStatus,
            PathTarget::Session(_) if *method == Method::DELETE => UploadOperation::AbortUpload,
            _ => {
                return Err(UploadError::with_message(
                    UploadErrorCode::MethodNotAllowed,
                    format!("{method} is not allowed on {}", uri.path()),
                ));
            }
        };

        let upload_id = match target {
            PathTarget::Collection => None,
            PathTarget::Session(raw) => Some(decode_uri_component(raw)),
        };

        Ok(RoutingContext {
            operation,
            upload_id,
            query_params,
        })
    }

    fn match_path<'a>(&self, path: &'a str) -> Option<PathTarget<'a>> {
        let rest = path.strip_prefix(self.base_path.as_str())?;
        if rest.is_empty() || rest == "/" {
            return Some(PathTarget::Collection);
        }
        let segment = rest.strip_prefix('/')?;
        let segment = segment.strip_suffix('/').unwrap_or(segment);
        if segment.is_empty() || segment.contains('/') {
            return None;
        }
        Some(PathTarget::Session(segment))
    }
}

/// Which resource under the base path a request addresses.
#[derive(Debug)]
enum PathTarget<'a> {
    Collection,
    Session(&'a str),
}

/// Decode a percent-encoded URI component.
fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Parse a query string into key-value pairs.
fn parse_query_params(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_uri_component(key), decode_uri_component(value)),
            None => (decode_uri_component(pair), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use http::Request;

    use super::*;

    fn request(method: Method, uri: &str) -> Request<()> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .expect("valid request")
    }

    fn resolve(method: Method, uri: &str) -> Result<RoutingContext, UploadError> {
        UploadRouter::default().resolve(&request(method, uri))
    }

    #[test]
    fn test_should_route_post_to_collection() {
        for uri in ["/media/upload", "/media/upload/"] {
            let ctx = resolve(Method::POST, uri).expect("should route");
            assert_eq!(ctx.operation, UploadOperation::UploadFiles);
            assert!(ctx.upload_id.is_none());
        }
    }

    #[test]
    fn test_should_route_status_with_query() {
        let ctx = resolve(Method::GET, "/media/upload/up-1?totalChunks=4").expect("should route");
        assert_eq!(ctx.operation, UploadOperation::GetUploadStatus);
        assert_eq!(ctx.upload_id.as_deref(), Some("up-1"));
        assert_eq!(ctx.query_value("totalChunks"), Some("4"));
    }

    #[test]
    fn test_should_route_abort() {
        let ctx = resolve(Method::DELETE, "/media/upload/up-1/").expect("should route");
        assert_eq!(ctx.operation, UploadOperation::AbortUpload);
        assert_eq!(ctx.upload_id.as_deref(), Some("up-1"));
    }

    #[test]
    fn test_should_decode_upload_id_from_path() {
        let ctx = resolve(Method::GET, "/media/upload/a%2E%2E").expect("should route");
        assert_eq!(ctx.upload_id.as_deref(), Some("a.."));
    }

    #[test]
    fn test_should_reject_unknown_paths() {
        for uri in ["/", "/media", "/media/uploads", "/media/upload/a/b"] {
            let err = resolve(Method::GET, uri).unwrap_err();
            assert_eq!(err.code, UploadErrorCode::NotFound, "{uri}");
        }
    }

    #[test]
    fn test_should_reject_wrong_methods() {
        let cases = [
            (Method::GET, "/media/upload"),
            (Method::PUT, "/media/upload"),
            (Method::POST, "/media/upload/up-1"),
            (Method::PATCH, "/media/upload/up-1"),
        ];
        for (method, uri) in cases {
            let err = resolve(method.clone(), uri).unwrap_err();
            assert_eq!(err.code, UploadErrorCode::MethodNotAllowed, "{method} {uri}");
        }
    }

    #[test]
    fn test_should_normalize_base_path() {
        let router = UploadRouter::new("api/files/");
        assert_eq!(router.base_path(), "/api/files");
        let ctx = router
            .resolve(&request(Method::POST, "/api/files"))
            .expect("should route");
        assert_eq!(ctx.operation, UploadOperation::UploadFiles);
    }

    #[test]
    fn test_should_parse_query_params() {
        let params = parse_query_params("totalChunks=3&flag&name=a%20b");
        assert_eq!(
            params,
            vec![
                ("totalChunks".to_owned(), "3".to_owned()),
                ("flag".to_owned(), String::new()),
                ("name".to_owned(), "a b".to_owned()),
            ]
        );
    }
}
