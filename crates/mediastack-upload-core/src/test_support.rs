//! Shared fixtures for unit tests.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashSet;
use mediastack_core::UploadId;
use mediastack_upload_model::input::{FilePart, FinalizeUploadInput, UploadChunkInput};

use crate::config::UploadConfig;
use crate::media::{LocalMediaStore, MediaStore, MediaStoreError, NewMedia, StoredMedia};
use crate::provider::MediaUploader;
use crate::scratch::{BlobEntry, BlobWriter, FsScratchStore, ScratchStore, SessionEntry};

pub(crate) const FILE_PROVIDER: &str = "media.provider.file";
pub(crate) const IMAGE_PROVIDER: &str = "media.provider.image";

/// A provider wired to temp directories.
pub(crate) struct TestHarness {
    pub(crate) dir: tempfile::TempDir,
    pub(crate) uploader: MediaUploader,
    pub(crate) media: Arc<FailingMediaStore>,
    pub(crate) scratch: Arc<FlakyScratchStore>,
}

impl TestHarness {
    pub(crate) fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub(crate) fn with_config(customize: impl FnOnce(&mut UploadConfig)) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut config = UploadConfig::builder()
            .scratch_dir(dir.path().join("scratch").to_string_lossy().into_owned())
            .media_dir(dir.path().join("media").to_string_lossy().into_owned())
            .public_base_url("http://media.test".to_owned())
            .contexts(BTreeMap::from([
                (
                    "default".to_owned(),
                    vec![FILE_PROVIDER.to_owned(), IMAGE_PROVIDER.to_owned()],
                ),
                ("docs".to_owned(), vec![FILE_PROVIDER.to_owned()]),
            ]))
            .build();
        customize(&mut config);

        let scratch = Arc::new(FlakyScratchStore::new(FsScratchStore::new(&config.scratch_dir)));
        let media = Arc::new(FailingMediaStore::new(LocalMediaStore::new(
            &config.media_dir,
            config.public_base_url.clone(),
            config.contexts.clone(),
            config.image_provider.clone(),
        )));
        let uploader = MediaUploader::with_collaborators(
            config,
            Arc::clone(&scratch) as Arc<dyn ScratchStore>,
            Arc::clone(&media) as Arc<dyn MediaStore>,
        )
        .expect("build uploader");

        Self {
            dir,
            uploader,
            media,
            scratch,
        }
    }

    pub(crate) fn scratch_root(&self) -> PathBuf {
        self.dir.path().join("scratch")
    }

    pub(crate) fn session_dir(&self, upload_id: &str) -> PathBuf {
        self.scratch_root().join(upload_id)
    }

    /// Number of entries directly under the scratch root.
    pub(crate) fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.scratch_root()).map_or(0, Iterator::count)
    }

    pub(crate) async fn put_chunk(&self, upload_id: &str, index: i64, total: i64, data: &'static [u8]) {
        self.uploader
            .receive_chunk(chunk_input(upload_id, index, total, data))
            .await
            .unwrap_or_else(|e| panic!("chunk {index} of {upload_id} failed: {e}"));
    }
}

pub(crate) fn upload_id(raw: &str) -> UploadId {
    UploadId::parse(raw, &mediastack_core::IdPattern::default())
        .unwrap_or_else(|e| panic!("invalid test id {raw}: {e}"))
}

pub(crate) fn file_part(name: &str, content_type: &str, data: &'static [u8]) -> FilePart {
    FilePart {
        field_name: "files[]".to_owned(),
        file_name: Some(name.to_owned()),
        content_type: Some(content_type.to_owned()),
        data: Bytes::from_static(data),
    }
}

pub(crate) fn chunk_input(upload_id: &str, index: i64, total: i64, data: &'static [u8]) -> UploadChunkInput {
    UploadChunkInput {
        upload_id: upload_id.to_owned(),
        chunk_index: index,
        total_chunks: total,
        chunk: Some(file_part("blob", "application/octet-stream", data)),
    }
}

pub(crate) fn finalize_input(upload_id: &str, total: i64, name: &str) -> FinalizeUploadInput {
    FinalizeUploadInput {
        upload_id: upload_id.to_owned(),
        total_chunks: total,
        file_name: Some(name.to_owned()),
        file_type: Some("text/plain".to_owned()),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Fault-injecting collaborators
// ---------------------------------------------------------------------------

/// Media store that fails for configured display names.
#[derive(Debug)]
pub(crate) struct FailingMediaStore {
    pub(crate) inner: LocalMediaStore,
    fail_names: DashSet<String>,
}

impl FailingMediaStore {
    fn new(inner: LocalMediaStore) -> Self {
        Self {
            inner,
            fail_names: DashSet::new(),
        }
    }

    pub(crate) fn fail_on(&self, name: &str) {
        self.fail_names.insert(name.to_owned());
    }
}

#[async_trait]
impl MediaStore for FailingMediaStore {
    fn supports_provider(&self, context: &str, provider: &str) -> bool {
        self.inner.supports_provider(context, provider)
    }

    async fn create_media(&self, media: NewMedia) -> Result<StoredMedia, MediaStoreError> {
        if self.fail_names.contains(&media.name) {
            return Err(MediaStoreError::Rejected {
                message: format!("storage backend refused {}", media.name),
            });
        }
        self.inner.create_media(media).await
    }
}

/// Scratch store that fails reads of configured blob names.
#[derive(Debug)]
pub(crate) struct FlakyScratchStore {
    inner: FsScratchStore,
    unreadable: DashSet<String>,
}

impl FlakyScratchStore {
    fn new(inner: FsScratchStore) -> Self {
        Self {
            inner,
            unreadable: DashSet::new(),
        }
    }

    pub(crate) fn fail_reads_of(&self, name: &str) {
        self.unreadable.insert(name.to_owned());
    }
}

#[async_trait]
impl ScratchStore for FlakyScratchStore {
    async fn ensure_session(&self, id: &UploadId) -> io::Result<()> {
        self.inner.ensure_session(id).await
    }

    async fn session_exists(&self, id: &UploadId) -> io::Result<bool> {
        self.inner.session_exists(id).await
    }

    async fn write_blob(&self, id: &UploadId, name: &str, data: Bytes) -> io::Result<()> {
        self.inner.write_blob(id, name, data).await
    }

    async fn create_blob(&self, id: &UploadId, name: &str, data: Bytes) -> io::Result<bool> {
        self.inner.create_blob(id, name, data).await
    }

    async fn read_blob(&self, id: &UploadId, name: &str) -> io::Result<Option<Bytes>> {
        if self.unreadable.contains(name) {
            return Err(io::Error::other(format!("injected read failure for {name}")));
        }
        self.inner.read_blob(id, name).await
    }

    async fn blob_len(&self, id: &UploadId, name: &str) -> io::Result<Option<u64>> {
        self.inner.blob_len(id, name).await
    }

    async fn list_blobs(&self, id: &UploadId) -> io::Result<Vec<BlobEntry>> {
        self.inner.list_blobs(id).await
    }

    async fn delete_blob(&self, id: &UploadId, name: &str) -> io::Result<bool> {
        self.inner.delete_blob(id, name).await
    }

    async fn open_writer(&self, id: &UploadId, name: &str) -> io::Result<Box<dyn BlobWriter>> {
        self.inner.open_writer(id, name).await
    }

    async fn remove_session(&self, id: &UploadId) -> io::Result<bool> {
        self.inner.remove_session(id).await
    }

    async fn list_sessions(&self) -> io::Result<Vec<SessionEntry>> {
        self.inner.list_sessions().await
    }
}
