//! Media store collaborator.
//!
//! The assembler hands every finished upload to a [`MediaStore`], which
//! persists it and returns a [`StoredMedia`] record. [`LocalMediaStore`] is
//! the bundled implementation: it copies files under a media root, one
//! directory per context, and publishes them under a base URL.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mediastack_upload_model::output::MediaRecord;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// Where the bytes of a new media record come from.
#[derive(Debug, Clone)]
pub enum MediaSource {
    /// A readable file, owned by the caller and removed after the call.
    File(PathBuf),
    /// An in-memory payload.
    Bytes(Bytes),
}

/// A media record to create.
#[derive(Debug, Clone)]
pub struct NewMedia {
    /// File contents.
    pub source: MediaSource,
    /// Sanitized display name.
    pub name: String,
    /// MIME type.
    pub content_type: String,
    /// Context tag.
    pub context: String,
    /// Provider name.
    pub provider: String,
}

/// A persisted media record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    /// Identifier assigned by the store.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Public URL.
    pub url: String,
    /// Storage reference relative to the store root.
    pub reference: String,
    /// Context tag.
    pub context: String,
    /// Provider name.
    pub provider: String,
    /// MIME type.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<StoredMedia> for MediaRecord {
    fn from(media: StoredMedia) -> Self {
        Self {
            id: media.id,
            name: media.name,
            url: media.url,
            path: media.reference,
            size: media.size,
            content_type: media.content_type,
        }
    }
}

/// Media store failure.
#[derive(Debug, thiserror::Error)]
pub enum MediaStoreError {
    /// The context is not configured.
    #[error("Unknown media context: {context}")]
    UnknownContext {
        /// The requested context.
        context: String,
    },

    /// The context does not accept the provider.
    #[error("Provider {provider} is not enabled for context {context}")]
    UnsupportedProvider {
        /// The requested context.
        context: String,
        /// The requested provider.
        provider: String,
    },

    /// The store refused the file.
    #[error("{message}")]
    Rejected {
        /// Reason given by the store.
        message: String,
    },

    /// Persisting the file failed.
    #[error("Failed to persist media: {0}")]
    Io(#[from] io::Error),
}

/// Persists finished uploads as media records.
#[async_trait]
pub trait MediaStore: Send + Sync + fmt::Debug {
    /// Whether `context` accepts `provider`.
    fn supports_provider(&self, context: &str, provider: &str) -> bool;

    /// Create a media record from `media`.
    ///
    /// A [`MediaSource::File`] must be fully read before this returns; the
    /// caller deletes it afterwards.
    async fn create_media(&self, media: NewMedia) -> Result<StoredMedia, MediaStoreError>;
}

// ---------------------------------------------------------------------------
// Local implementation
// ---------------------------------------------------------------------------

/// Local-disk [`MediaStore`].
///
/// Records are kept in memory; files live at `<root>/<context>/<uuid><ext>`
/// and are published as `<public_base_url>/<context>/<uuid><ext>`.
#[derive(Debug)]
pub struct LocalMediaStore {
    root: PathBuf,
    public_base_url: String,
    contexts: BTreeMap<String, Vec<String>>,
    image_provider: String,
    next_id: AtomicU64,
    records: DashMap<u64, StoredMedia>,
}

impl LocalMediaStore {
    /// Create a store.
    ///
    /// `image_provider` only accepts `image/*` content.
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        contexts: BTreeMap<String, Vec<String>>,
        image_provider: impl Into<String>,
    ) -> Self {
        let root = root.into();
        debug!(root = %root.display(), contexts = contexts.len(), "creating LocalMediaStore");
        Self {
            root,
            public_base_url: public_base_url.into(),
            contexts,
            image_provider: image_provider.into(),
            next_id: AtomicU64::new(1),
            records: DashMap::new(),
        }
    }

    /// Root directory of stored files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<StoredMedia> {
        self.records.get(&id).map(|r| r.clone())
    }

    /// Number of records created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn check_provider(&self, context: &str, provider: &str) -> Result<(), MediaStoreError> {
        let providers = self
            .contexts
            .get(context)
            .ok_or_else(|| MediaStoreError::UnknownContext {
                context: context.to_owned(),
            })?;
        if !providers.iter().any(|p| p == provider) {
            return Err(MediaStoreError::UnsupportedProvider {
                context: context.to_owned(),
                provider: provider.to_owned(),
            });
        }
        Ok(())
    }

    fn public_url(&self, reference: &str) -> String {
        format!("{}/{reference}", self.public_base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    fn supports_provider(&self, context: &str, provider: &str) -> bool {
        self.check_provider(context, provider).is_ok()
    }

    async fn create_media(&self, media: NewMedia) -> Result<StoredMedia, MediaStoreError> {
        self.check_provider(&media.context, &media.provider)?;
        if media.provider == self.image_provider && !media.content_type.starts_with("image/") {
            return Err(MediaStoreError::Rejected {
                message: format!(
                    "Provider {} only accepts images, got {}",
                    media.provider, media.content_type
                ),
            });
        }

        let reference = format!(
            "{}/{}{}",
            media.context,
            Uuid::new_v4().simple(),
            extension_of(&media.name)
        );
        let dest = self.root.join(&reference);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        let size = match &media.source {
            MediaSource::File(path) => fs::copy(path, &dest).await?,
            MediaSource::Bytes(data) => {
                fs::write(&dest, data).await?;
                data.len() as u64
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = StoredMedia {
            id,
            url: self.public_url(&reference),
            name: media.name,
            reference,
            context: media.context,
            provider: media.provider,
            content_type: media.content_type,
            size,
            created_at: Utc::now(),
        };
        self.records.insert(id, record.clone());
        info!(
            id,
            context = %record.context,
            provider = %record.provider,
            size,
            "created media record"
        );
        Ok(record)
    }
}

/// Lower-cased extension of `name` including the dot, or empty.
///
/// Only short alphanumeric extensions are kept.
fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.bytes().all(|b| b.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}
