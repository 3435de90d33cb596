//! The upload service provider.
//!
//! [`MediaUploader`] owns the configuration and collaborator handles of the
//! upload service. Individual operations are implemented in the
//! [`crate::ops`] submodules as `impl MediaUploader` blocks.

use std::sync::Arc;

use mediastack_core::{IdPattern, KeyedLocks, UploadId};

use crate::config::UploadConfig;
use crate::error::UploadServiceResult;
use crate::media::{LocalMediaStore, MediaStore};
use crate::scratch::{FsScratchStore, ScratchStore};
use crate::validation::validate_upload_id;

/// Chunked upload assembler.
///
/// All fields are `Arc`-wrapped so the provider can be cloned into every
/// connection task.
///
/// # Examples
///
/// ```
/// use mediastack_upload_core::MediaUploader;
/// use mediastack_upload_core::config::UploadConfig;
///
/// let uploader = MediaUploader::from_config(UploadConfig::default()).unwrap();
/// assert_eq!(uploader.config().default_context, "default");
/// ```
#[derive(Debug, Clone)]
pub struct MediaUploader {
    /// Service configuration.
    pub(crate) config: Arc<UploadConfig>,
    /// Compiled upload id pattern.
    pub(crate) id_pattern: Arc<IdPattern>,
    /// Chunk storage.
    pub(crate) scratch: Arc<dyn ScratchStore>,
    /// Destination of finished uploads.
    pub(crate) media: Arc<dyn MediaStore>,
    /// Per-session locks serializing finalize, abort and sweep.
    pub(crate) locks: Arc<KeyedLocks>,
}

impl MediaUploader {
    /// Create a provider backed by [`FsScratchStore`] and [`LocalMediaStore`].
    ///
    /// Fails only if the configured upload id pattern does not compile.
    pub fn from_config(config: UploadConfig) -> UploadServiceResult<Self> {
        let scratch = Arc::new(FsScratchStore::new(&config.scratch_dir));
        let media = Arc::new(LocalMediaStore::new(
            &config.media_dir,
            config.public_base_url.clone(),
            config.contexts.clone(),
            config.image_provider.clone(),
        ));
        Self::with_collaborators(config, scratch, media)
    }

    /// Create a provider with explicit collaborators.
    pub fn with_collaborators(
        config: UploadConfig,
        scratch: Arc<dyn ScratchStore>,
        media: Arc<dyn MediaStore>,
    ) -> UploadServiceResult<Self> {
        let id_pattern = IdPattern::new(&config.upload_id_pattern)?;
        Ok(Self {
            config: Arc::new(config),
            id_pattern: Arc::new(id_pattern),
            scratch,
            media,
            locks: Arc::new(KeyedLocks::new()),
        })
    }

    /// Returns the service configuration.
    #[must_use]
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Returns the scratch store.
    #[must_use]
    pub fn scratch(&self) -> &dyn ScratchStore {
        self.scratch.as_ref()
    }

    /// Returns the media store.
    #[must_use]
    pub fn media(&self) -> &dyn MediaStore {
        self.media.as_ref()
    }

    pub(crate) fn parse_upload_id(&self, raw: &str) -> UploadServiceResult<UploadId> {
        validate_upload_id(raw, &self.id_pattern)
    }

    /// Pick the provider for a file.
    ///
    /// Image content requested with the generic file provider is upgraded to
    /// the image provider when the context accepts it.
    pub(crate) fn resolve_provider(
        &self,
        content_type: &mime::Mime,
        requested: Option<&str>,
        context: &str,
    ) -> String {
        let requested = crate::validation::or_default(requested, &self.config.file_provider);
        if content_type.type_() == mime::IMAGE
            && requested == self.config.file_provider
            && self
                .media
                .supports_provider(context, &self.config.image_provider)
        {
            return self.config.image_provider.clone();
        }
        requested
    }
}
