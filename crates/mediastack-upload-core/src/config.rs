//! Upload service configuration.
//!
//! Provides [`UploadConfig`] for configuring the chunked upload service.
//! Configuration values are loaded from environment variables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

const DEFAULT_CONTEXT: &str = "default";
const FILE_PROVIDER: &str = "media.provider.file";
const IMAGE_PROVIDER: &str = "media.provider.image";
const DEFAULT_MEDIA_DIR: &str = "/var/lib/mediastack/media";
const DEFAULT_PUBLIC_URL: &str = "/uploads/media";
const DEFAULT_ID_PATTERN: &str = "^[A-Za-z0-9_-]+$";

/// Upload service configuration.
///
/// # Examples
///
/// ```
/// use mediastack_upload_core::config::UploadConfig;
///
/// let config = UploadConfig::default();
/// assert_eq!(config.default_context, "default");
/// assert_eq!(config.max_single_upload_size, 25 * 1024 * 1024);
/// assert!(config.pin_total_chunks);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    /// Root directory holding one scratch directory per upload session.
    #[builder(default = default_scratch_dir())]
    pub scratch_dir: String,

    /// Root directory of the local media store.
    #[builder(default = String::from(DEFAULT_MEDIA_DIR))]
    pub media_dir: String,

    /// Base URL media files are published under.
    #[builder(default = String::from(DEFAULT_PUBLIC_URL))]
    pub public_base_url: String,

    /// Media contexts and the providers each accepts.
    #[builder(default = default_contexts())]
    pub contexts: BTreeMap<String, Vec<String>>,

    /// Context used when a request names none.
    #[builder(default = String::from(DEFAULT_CONTEXT))]
    pub default_context: String,

    /// Generic file provider, also the default provider.
    #[builder(default = String::from(FILE_PROVIDER))]
    pub file_provider: String,

    /// Provider image uploads are upgraded to when the context allows it.
    #[builder(default = String::from(IMAGE_PROVIDER))]
    pub image_provider: String,

    /// Regular expression an upload id must match in full.
    #[builder(default = String::from(DEFAULT_ID_PATTERN))]
    pub upload_id_pattern: String,

    /// Largest accepted chunk payload in bytes.
    #[builder(default = 64 * 1024 * 1024)]
    pub max_chunk_size: u64,

    /// Largest accepted `totalChunks`.
    #[builder(default = 10_000)]
    pub max_total_chunks: u32,

    /// Largest file accepted by the single-shot path, in bytes.
    #[builder(default = 25 * 1024 * 1024)]
    pub max_single_upload_size: u64,

    /// Record `totalChunks` on the first chunk and reject later disagreement.
    #[builder(default = true)]
    pub pin_total_chunks: bool,

    /// Reject a finalize whose assembled size differs from the declared size.
    #[builder(default = false)]
    pub verify_declared_size: bool,

    /// Delete each chunk as soon as it has been appended during finalize.
    #[builder(default = true)]
    pub eager_chunk_release: bool,

    /// Age in seconds after which an idle session is swept.
    #[builder(default = 86_400)]
    pub stale_session_age_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl UploadConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `UPLOAD_SCRATCH_DIR` | `<tmp>/media_uploads` |
    /// | `MEDIA_DIR` | `$DATA_DIR/media`, else `/var/lib/mediastack/media` |
    /// | `MEDIA_PUBLIC_URL` | `/uploads/media` |
    /// | `MEDIA_CONTEXTS` | `default=media.provider.file,media.provider.image` |
    /// | `UPLOAD_DEFAULT_CONTEXT` | `default` |
    /// | `UPLOAD_FILE_PROVIDER` | `media.provider.file` |
    /// | `UPLOAD_IMAGE_PROVIDER` | `media.provider.image` |
    /// | `UPLOAD_ID_PATTERN` | `^[A-Za-z0-9_-]+$` |
    /// | `UPLOAD_MAX_CHUNK_SIZE` | `67108864` |
    /// | `UPLOAD_MAX_TOTAL_CHUNKS` | `10000` |
    /// | `UPLOAD_MAX_SINGLE_SIZE` | `26214400` |
    /// | `UPLOAD_PIN_TOTAL_CHUNKS` | `true` |
    /// | `UPLOAD_VERIFY_DECLARED_SIZE` | `false` |
    /// | `UPLOAD_EAGER_CHUNK_RELEASE` | `true` |
    /// | `UPLOAD_STALE_SESSION_AGE_SECS` | `86400` |
    ///
    /// Unparsable numeric values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("UPLOAD_SCRATCH_DIR") {
            config.scratch_dir = v;
        }
        if let Ok(v) = std::env::var("MEDIA_DIR") {
            config.media_dir = v;
        } else if let Ok(v) = std::env::var("DATA_DIR") {
            config.media_dir = format!("{}/media", v.trim_end_matches('/'));
        }
        if let Ok(v) = std::env::var("MEDIA_PUBLIC_URL") {
            config.public_base_url = v;
        }
        if let Ok(v) = std::env::var("MEDIA_CONTEXTS") {
            let contexts = parse_contexts(&v);
            if !contexts.is_empty() {
                config.contexts = contexts;
            }
        }
        if let Ok(v) = std::env::var("UPLOAD_DEFAULT_CONTEXT") {
            config.default_context = v;
        }
        if let Ok(v) = std::env::var("UPLOAD_FILE_PROVIDER") {
            config.file_provider = v;
        }
        if let Ok(v) = std::env::var("UPLOAD_IMAGE_PROVIDER") {
            config.image_provider = v;
        }
        if let Ok(v) = std::env::var("UPLOAD_ID_PATTERN") {
            config.upload_id_pattern = v;
        }
        if let Ok(v) = std::env::var("UPLOAD_MAX_CHUNK_SIZE") {
            if let Ok(n) = v.parse::<u64>() {
                config.max_chunk_size = n;
            }
        }
        if let Ok(v) = std::env::var("UPLOAD_MAX_TOTAL_CHUNKS") {
            if let Ok(n) = v.parse::<u32>() {
                config.max_total_chunks = n;
            }
        }
        if let Ok(v) = std::env::var("UPLOAD_MAX_SINGLE_SIZE") {
            if let Ok(n) = v.parse::<u64>() {
                config.max_single_upload_size = n;
            }
        }
        if let Ok(v) = std::env::var("UPLOAD_PIN_TOTAL_CHUNKS") {
            config.pin_total_chunks = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("UPLOAD_VERIFY_DECLARED_SIZE") {
            config.verify_declared_size = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("UPLOAD_EAGER_CHUNK_RELEASE") {
            config.eager_chunk_release = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("UPLOAD_STALE_SESSION_AGE_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.stale_session_age_secs = n;
            }
        }

        config
    }

    /// Idle age after which a session is considered abandoned.
    #[must_use]
    pub fn stale_session_age(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.stale_session_age_secs)
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Parse `ctx=provider,provider;ctx2=provider` into a context map.
///
/// Segments without `=` or without any provider are skipped.
fn parse_contexts(value: &str) -> BTreeMap<String, Vec<String>> {
    value
        .split(';')
        .filter_map(|segment| {
            let (context, providers) = segment.split_once('=')?;
            let context = context.trim();
            let providers: Vec<String> = providers
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_owned)
                .collect();
            (!context.is_empty() && !providers.is_empty())
                .then(|| (context.to_owned(), providers))
        })
        .collect()
}

fn default_scratch_dir() -> String {
    std::env::temp_dir()
        .join("media_uploads")
        .to_string_lossy()
        .into_owned()
}

fn default_contexts() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([(
        DEFAULT_CONTEXT.to_owned(),
        vec![FILE_PROVIDER.to_owned(), IMAGE_PROVIDER.to_owned()],
    )])
}
