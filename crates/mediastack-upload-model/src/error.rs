//! Error type returned to upload clients.

use std::fmt;

/// Well-known upload error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum UploadErrorCode {
    /// Upload identifier failed validation.
    InvalidUploadId,
    /// A form field is missing or malformed.
    InvalidArgument,
    /// Chunk index outside `[0, totalChunks)`.
    ChunkIndexOutOfRange,
    /// Chunk request carried no file part.
    MissingChunkPayload,
    /// Declared chunk count disagrees with the session.
    TotalChunksMismatch,
    /// No scratch session exists for the identifier.
    NoSuchUpload,
    /// Finalize found a gap in the chunk sequence.
    MissingChunk,
    /// Assembled size differs from the declared size.
    SizeMismatch,
    /// Payload exceeds a configured limit.
    EntityTooLarge,
    /// Request could not be decoded.
    MalformedRequest,
    /// Request content type is not supported.
    UnsupportedMediaType,
    /// No route for the request path.
    NotFound,
    /// Method not supported on the route.
    MethodNotAllowed,
    /// The media store rejected or failed to persist the file.
    MediaStoreFailure,
    /// Internal error.
    #[default]
    InternalError,
}

impl UploadErrorCode {
    /// Returns the error code as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidUploadId => "InvalidUploadId",
            Self::InvalidArgument => "InvalidArgument",
            Self::ChunkIndexOutOfRange => "ChunkIndexOutOfRange",
            Self::MissingChunkPayload => "MissingChunkPayload",
            Self::TotalChunksMismatch => "TotalChunksMismatch",
            Self::NoSuchUpload => "NoSuchUpload",
            Self::MissingChunk => "MissingChunk",
            Self::SizeMismatch => "SizeMismatch",
            Self::EntityTooLarge => "EntityTooLarge",
            Self::MalformedRequest => "MalformedRequest",
            Self::UnsupportedMediaType => "UnsupportedMediaType",
            Self::NotFound => "NotFound",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::MediaStoreFailure => "MediaStoreFailure",
            Self::InternalError => "InternalError",
        }
    }

    /// Returns the default HTTP status code for this error.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::InvalidUploadId
            | Self::InvalidArgument
            | Self::ChunkIndexOutOfRange
            | Self::MissingChunkPayload
            | Self::MissingChunk
            | Self::SizeMismatch
            | Self::MalformedRequest => http::StatusCode::BAD_REQUEST,
            Self::TotalChunksMismatch => http::StatusCode::CONFLICT,
            Self::NoSuchUpload | Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::EntityTooLarge => http::StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType => http::StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::MediaStoreFailure | Self::InternalError => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the default message for this error.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::InvalidUploadId => "Invalid upload id",
            Self::InvalidArgument => "Invalid argument",
            Self::ChunkIndexOutOfRange => "Chunk index out of range",
            Self::MissingChunkPayload => "No chunk file received",
            Self::TotalChunksMismatch => "Total chunk count does not match the upload session",
            Self::NoSuchUpload => "Upload session not found",
            Self::MissingChunk => "Upload is missing a chunk",
            Self::SizeMismatch => "Assembled size does not match the declared size",
            Self::EntityTooLarge => "Payload exceeds the maximum allowed size",
            Self::MalformedRequest => "The request could not be decoded",
            Self::UnsupportedMediaType => "Unsupported content type",
            Self::NotFound => "Not found",
            Self::MethodNotAllowed => "The method is not allowed on this resource",
            Self::MediaStoreFailure => "The media store failed to persist the file",
            Self::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for UploadErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An upload error response.
#[derive(Debug)]
pub struct UploadError {
    /// The error code.
    pub code: UploadErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The upload or file the error refers to.
    pub resource: Option<String>,
    /// The request ID.
    pub request_id: Option<String>,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UploadError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl UploadError {
    /// Create a new error from a code with its default message.
    #[must_use]
    pub fn new(code: UploadErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Create a new error with a custom message.
    #[must_use]
    pub fn with_message(code: UploadErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            resource: None,
            request_id: None,
            source: None,
        }
    }

    /// Set the resource that caused this error.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Override the HTTP status code.
    #[must_use]
    pub fn with_status(mut self, status_code: http::StatusCode) -> Self {
        self.status_code = status_code;
        self
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create an InvalidArgument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::with_message(UploadErrorCode::InvalidArgument, message)
    }

    /// Create a MalformedRequest error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::with_message(UploadErrorCode::MalformedRequest, message)
    }

    /// Create a NoSuchUpload error.
    #[must_use]
    pub fn no_such_upload(upload_id: impl Into<String>) -> Self {
        Self::new(UploadErrorCode::NoSuchUpload).with_resource(upload_id)
    }

    /// Create an InternalError error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_message(UploadErrorCode::InternalError, message)
    }

    /// Whether the error is the client's fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code.is_client_error()
    }
}
