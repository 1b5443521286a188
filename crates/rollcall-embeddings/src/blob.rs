//! Opaque blob persistence for the embedding snapshot.
//!
//! The store only needs "read the whole blob" and "replace the whole blob
//! atomically" — the snapshot format lives in [`crate::snapshot`], and
//! alternative backends (object storage, a database BLOB column) can slot
//! in behind this trait.

use std::path::PathBuf;

use crate::errors::Result;

/// Whole-blob read/write keyed by a fixed storage location.
pub trait BlobStore: Send + Sync {
    /// Read the full blob. `None` when nothing has been persisted yet.
    fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the blob. Either fully succeeds or leaves the prior
    /// persisted state untouched.
    fn write(&self, data: &[u8]) -> Result<()>;
}

/// File-backed blob store with atomic replace semantics.
///
/// Writes go to a temp file in the target directory, then rename over the
/// destination — a crash mid-write never corrupts the prior snapshot.
pub struct FileBlobStore {
    path: PathBuf,
}

impl FileBlobStore {
    /// Create a store targeting `path`. Parent directories are created on
    /// first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The target path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl BlobStore for FileBlobStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| std::path::Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, data)?;
        tmp.as_file().sync_all()?;
        let _ = tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!(path = %self.path.display(), bytes = data.len(), "snapshot persisted");
        Ok(())
    }
}

/// In-memory blob store for tests.
#[derive(Default)]
pub struct MemoryBlobStore {
    data: parking_lot::Mutex<Option<Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().clone())
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        *self.data.lock() = Some(data.to_vec());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
