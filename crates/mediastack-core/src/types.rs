//! Identifier types shared across the upload services.

use std::fmt;

use regex::Regex;

use crate::MediaStackError;

/// Pattern an [`UploadId`] must match in full.
///
/// Wraps a compiled [`Regex`]. The default accepts ASCII letters, digits,
/// `_` and `-`.
#[derive(Debug, Clone)]
pub struct IdPattern(Regex);

impl IdPattern {
    /// Default upload identifier pattern.
    pub const DEFAULT: &str = "^[A-Za-z0-9_-]+$";

    /// Compile a custom identifier pattern.
    ///
    /// # Errors
    /// Returns [`MediaStackError::Config`] if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self, MediaStackError> {
        Regex::new(pattern)
            .map(Self)
            .map_err(|e| MediaStackError::Config(format!("invalid upload id pattern: {e}")))
    }

    /// Whether `value` matches the pattern.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }

    /// The source text of the pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for IdPattern {
    fn default() -> Self {
        Self(Regex::new(Self::DEFAULT).unwrap_or_else(|e| unreachable!("default pattern: {e}")))
    }
}

/// Client-supplied identifier of one upload session.
///
/// An `UploadId` is used verbatim as a directory name in scratch storage, so
/// construction rejects anything that could escape that directory: path
/// separators, `.`/`..`, NUL and other control characters. The configured
/// [`IdPattern`] is applied on top of that guard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct UploadId(String);

impl UploadId {
    /// Maximum identifier length in bytes.
    pub const MAX_LEN: usize = 128;

    /// Validate `raw` against the path guard and `pattern`.
    ///
    /// # Errors
    /// Returns [`MediaStackError::InvalidUploadId`] when validation fails.
    pub fn parse(raw: impl Into<String>, pattern: &IdPattern) -> Result<Self, MediaStackError> {
        let raw = raw.into();
        if !is_path_safe(&raw) || !pattern.is_match(&raw) {
            return Err(MediaStackError::InvalidUploadId(raw));
        }
        Ok(Self(raw))
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UploadId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_path_safe(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= UploadId::MAX_LEN
        && raw != "."
        && raw != ".."
        && !raw
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
}
