//! Error types for the MediaStack core.

/// Core error type for MediaStack infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum MediaStackError {
    /// Upload identifier is empty, too long, or contains disallowed characters.
    #[error("invalid upload id: {0:?}")]
    InvalidUploadId(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for MediaStack operations.
pub type MediaStackResult<T> = Result<T, MediaStackError>;
