//! Per-session scratch storage.
//!
//! [`ScratchStore`] is the seam between the assembler and whatever holds
//! chunks while an upload is in flight. [`FsScratchStore`] keeps one
//! directory per session under a root directory:
//!
//! ```text
//! <root>/<upload_id>/
//!     session.json          manifest pinning totalChunks
//!     chunk_0 .. chunk_N-1  chunk payloads
//!     assembled-<uuid>      output being built during finalize
//! ```
//!
//! Implementations must treat session creation as idempotent (a concurrent
//! create of the same session is success) and must make
//! [`ScratchStore::write_blob`] atomic, so readers never observe a torn blob.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use mediastack_core::UploadId;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Blob name of the session manifest.
pub const MANIFEST_BLOB: &str = "session.json";

const CHUNK_PREFIX: &str = "chunk_";

/// Blob name of chunk `index`.
#[must_use]
pub fn chunk_blob_name(index: u32) -> String {
    format!("{CHUNK_PREFIX}{index}")
}

/// Parse a chunk index back out of a blob name.
#[must_use]
pub fn parse_chunk_blob_name(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(CHUNK_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// A named blob and its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    /// Blob name within the session.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

/// A session directory found by [`ScratchStore::list_sessions`].
#[derive(Debug, Clone)]
pub struct SessionEntry {
    /// Raw directory name; not yet validated as an upload id.
    pub name: String,
    /// Last modification time of the session.
    pub modified: SystemTime,
}

/// A fully written output blob.
#[derive(Debug, Clone)]
pub struct AssembledBlob {
    /// Blob name within the session.
    pub name: String,
    /// Readable location of the blob.
    pub path: PathBuf,
    /// Bytes written.
    pub size: u64,
}

/// Append-only writer for an output blob.
#[async_trait]
pub trait BlobWriter: Send + fmt::Debug {
    /// Append `data` to the blob.
    async fn append(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush and sync the blob, returning its final location and size.
    async fn finish(&mut self) -> io::Result<AssembledBlob>;
}

/// Scoped blob storage keyed by upload session.
#[async_trait]
pub trait ScratchStore: Send + Sync + fmt::Debug {
    /// Create the session if it does not exist. Idempotent.
    async fn ensure_session(&self, id: &UploadId) -> io::Result<()>;

    /// Whether the session exists.
    async fn session_exists(&self, id: &UploadId) -> io::Result<bool>;

    /// Atomically create or replace a blob.
    async fn write_blob(&self, id: &UploadId, name: &str, data: Bytes) -> io::Result<()>;

    /// Atomically create a blob only if it is absent. Returns `false` when it
    /// already existed, leaving the existing content untouched.
    async fn create_blob(&self, id: &UploadId, name: &str, data: Bytes) -> io::Result<bool>;

    /// Read a whole blob, `None` if absent.
    async fn read_blob(&self, id: &UploadId, name: &str) -> io::Result<Option<Bytes>>;

    /// Size of a blob, `None` if absent.
    async fn blob_len(&self, id: &UploadId, name: &str) -> io::Result<Option<u64>>;

    /// List the blobs of a session. A missing session lists as empty.
    async fn list_blobs(&self, id: &UploadId) -> io::Result<Vec<BlobEntry>>;

    /// Delete a blob. Returns `false` if it was already absent.
    async fn delete_blob(&self, id: &UploadId, name: &str) -> io::Result<bool>;

    /// Open a new output blob for appending.
    async fn open_writer(&self, id: &UploadId, name: &str) -> io::Result<Box<dyn BlobWriter>>;

    /// Remove a session and everything in it. Returns `false` if it was absent.
    async fn remove_session(&self, id: &UploadId) -> io::Result<bool>;

    /// List every session directory under the store root.
    async fn list_sessions(&self) -> io::Result<Vec<SessionEntry>>;
}

// ---------------------------------------------------------------------------
// Filesystem implementation
// ---------------------------------------------------------------------------

/// Local-disk [`ScratchStore`] rooted at one directory.
#[derive(Debug, Clone)]
pub struct FsScratchStore {
    root: PathBuf,
}

impl FsScratchStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!(root = %root.display(), "creating FsScratchStore");
        Self { root }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, id: &UploadId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn blob_path(&self, id: &UploadId, name: &str) -> io::Result<PathBuf> {
        if name.is_empty()
            || name.starts_with('.')
            || name.contains(['/', '\\', '\0'])
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid blob name: {name:?}"),
            ));
        }
        Ok(self.session_dir(id).join(name))
    }

    fn temp_path(&self, id: &UploadId, name: &str) -> PathBuf {
        self.session_dir(id)
            .join(format!(".{name}.tmp.{}", Uuid::new_v4().simple()))
    }

    async fn write_temp(&self, id: &UploadId, name: &str, data: &[u8]) -> io::Result<PathBuf> {
        let temp_path = self.temp_path(id, name);
        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;
        match written {
            Ok(()) => Ok(temp_path),
            Err(e) => {
                remove_file_quietly(&temp_path).await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ScratchStore for FsScratchStore {
    async fn ensure_session(&self, id: &UploadId) -> io::Result<()> {
        fs::create_dir_all(self.session_dir(id)).await
    }

    async fn session_exists(&self, id: &UploadId) -> io::Result<bool> {
        match fs::metadata(self.session_dir(id)).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn write_blob(&self, id: &UploadId, name: &str, data: Bytes) -> io::Result<()> {
        let path = self.blob_path(id, name)?;
        let temp_path = self.write_temp(id, name, &data).await?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            remove_file_quietly(&temp_path).await;
            return Err(e);
        }
        trace!(upload_id = %id, name, size = data.len(), "wrote scratch blob");
        Ok(())
    }

    async fn create_blob(&self, id: &UploadId, name: &str, data: Bytes) -> io::Result<bool> {
        let path = self.blob_path(id, name)?;
        let temp_path = self.write_temp(id, name, &data).await?;
        // hard_link fails with AlreadyExists instead of replacing the target.
        let linked = fs::hard_link(&temp_path, &path).await;
        remove_file_quietly(&temp_path).await;
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn read_blob(&self, id: &UploadId, name: &str) -> io::Result<Option<Bytes>> {
        let path = self.blob_path(id, name)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn blob_len(&self, id: &UploadId, name: &str) -> io::Result<Option<u64>> {
        let path = self.blob_path(id, name)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_blobs(&self, id: &UploadId) -> io::Result<Vec<BlobEntry>> {
        let mut entries = match fs::read_dir(self.session_dir(id)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut blobs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            // A blob may be replaced or removed between listing and stat.
            match entry.metadata().await {
                Ok(meta) if meta.is_file() => blobs.push(BlobEntry {
                    name,
                    size: meta.len(),
                }),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(blobs)
    }

    async fn delete_blob(&self, id: &UploadId, name: &str) -> io::Result<bool> {
        let path = self.blob_path(id, name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                trace!(upload_id = %id, name, "deleted scratch blob");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn open_writer(&self, id: &UploadId, name: &str) -> io::Result<Box<dyn BlobWriter>> {
        let path = self.blob_path(id, name)?;
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        Ok(Box::new(FsBlobWriter {
            name: name.to_owned(),
            path,
            writer: BufWriter::new(file),
            written: 0,
        }))
    }

    async fn remove_session(&self, id: &UploadId) -> io::Result<bool> {
        match fs::remove_dir_all(self.session_dir(id)).await {
            Ok(()) => {
                debug!(upload_id = %id, "removed scratch session");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_sessions(&self) -> io::Result<Vec<SessionEntry>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            if !meta.is_dir() {
                continue;
            }
            sessions.push(SessionEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                modified: meta.modified()?,
            });
        }
        Ok(sessions)
    }
}

#[derive(Debug)]
struct FsBlobWriter {
    name: String,
    path: PathBuf,
    writer: BufWriter<fs::File>,
    written: u64,
}

#[async_trait]
impl BlobWriter for FsBlobWriter {
    async fn append(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data).await?;
        self.written += data.len() as u64;
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<AssembledBlob> {
        self.writer.flush().await?;
        self.writer.get_ref().sync_all().await?;
        Ok(AssembledBlob {
            name: self.name.clone(),
            path: self.path.clone(),
            size: self.written,
        })
    }
}

async fn remove_file_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove temp file");
        }
    }
}
