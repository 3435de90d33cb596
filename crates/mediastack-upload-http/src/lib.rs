//! Upload HTTP routing, form decoding, response serialization, and hyper service.
//!
//! This crate provides the HTTP layer of the MediaStack upload endpoint:
//!
//! - **Routing** ([`router`]): Maps method and path to an upload operation.
//!
//! - **Multipart** ([`multipart`]): Splits `multipart/form-data` bodies into
//!   text fields and file parts.
//!
//! - **Request decoding** ([`request`]): Turns a routed request and its body
//!   into a typed [`UploadRequest`](request::UploadRequest).
//!
//! - **Response serialization** ([`response`]): JSON bodies for outputs and
//!   errors.
//!
//! - **Dispatch** ([`dispatch`]): The [`UploadHandler`](dispatch::UploadHandler)
//!   boundary to the upload service.
//!
//! - **Service** ([`service`]): The [`UploadHttpService`](service::UploadHttpService)
//!   that implements hyper's `Service` trait.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> UploadHttpService (hyper Service)
//!     -> Health check / CORS interception
//!     -> UploadRouter (method + path -> operation)
//!     -> Body collection (bounded)
//!     -> decode_request (multipart / urlencoded form -> UploadRequest)
//!     -> dispatch_request (UploadHandler trait)
//!     -> Common response headers (x-request-id, Server, CORS)
//!   <- HTTP Response (JSON)
//! ```

// UploadError carries its source and status inline; it is returned by value
// on every decoding path.
#![allow(clippy::result_large_err)]

pub mod body;
pub mod dispatch;
pub mod multipart;
pub mod request;
pub mod response;
pub mod router;
pub mod service;

pub use body::UploadResponseBody;
pub use dispatch::{HandlerFuture, UploadHandler};
pub use request::UploadRequest;
pub use response::IntoUploadResponse;
pub use router::{RoutingContext, UploadRouter};
pub use service::{UploadHttpConfig, UploadHttpService};
