//! In-memory embedding collection with wholesale blob persistence.
//!
//! The live record set sits behind `RwLock<Arc<Vec<_>>>`: readers clone the
//! `Arc` and scan a consistent snapshot while a concurrent reload or retrain
//! swaps in a fully built replacement. Readers never observe a partially
//! replaced collection.

use std::sync::Arc;

use parking_lot::RwLock;
use rollcall_core::RecognitionConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::blob::BlobStore;
use crate::errors::{EmbeddingError, Result};
use crate::snapshot;

/// One labeled reference vector. Multiple records may share a label — an
/// identity can have several enrollment images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Identity label this vector belongs to.
    pub label: String,
    /// Extracted feature vector.
    pub vector: Vec<f32>,
}

/// Owns the full embedding collection for the process lifetime.
///
/// Matching reads a snapshot; mutation happens only through [`append`],
/// [`replace_all`], and [`load`], each of which validates dimension
/// uniformity before publishing.
///
/// [`append`]: EmbeddingStore::append
/// [`replace_all`]: EmbeddingStore::replace_all
/// [`load`]: EmbeddingStore::load
pub struct EmbeddingStore {
    blob: Box<dyn BlobStore>,
    expected_dim: Option<usize>,
    records: RwLock<Arc<Vec<EmbeddingRecord>>>,
}

impl EmbeddingStore {
    /// Create an empty store over the given blob backend.
    pub fn new(blob: Box<dyn BlobStore>) -> Self {
        Self {
            blob,
            expected_dim: None,
            records: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Create a store that rejects any vector whose length differs from
    /// `dim`, even the first one.
    pub fn with_expected_dimensions(blob: Box<dyn BlobStore>, dim: usize) -> Self {
        Self {
            blob,
            expected_dim: Some(dim),
            records: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Create a store configured from [`RecognitionConfig`]: when
    /// `embedding_dimensions` is set, every vector is validated against it.
    pub fn from_config(blob: Box<dyn BlobStore>, config: &RecognitionConfig) -> Self {
        match config.embedding_dimensions {
            Some(dim) => Self::with_expected_dimensions(blob, dim),
            None => Self::new(blob),
        }
    }

    /// Replace the in-memory collection from the persisted blob.
    ///
    /// A missing blob loads as an empty store. An undecodable blob fails
    /// with [`EmbeddingError::Corrupt`]; a decoded dimension that disagrees
    /// with the configured one fails with `DimensionMismatch`. In-flight
    /// readers keep their old snapshot until the swap completes.
    pub fn load(&self) -> Result<()> {
        let loaded = match self.blob.read()? {
            Some(data) => snapshot::decode(&data)?,
            None => {
                debug!("no persisted snapshot, starting empty");
                Vec::new()
            }
        };

        if let (Some(expected), Some(first)) = (self.expected_dim, loaded.first()) {
            if first.vector.len() != expected {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: first.vector.len(),
                });
            }
        }

        let count = loaded.len();
        *self.records.write() = Arc::new(loaded);
        info!(records = count, "embedding store loaded");
        Ok(())
    }

    /// Persist the full current collection.
    ///
    /// Atomicity is delegated to the blob backend: either the write fully
    /// succeeds or the prior persisted state is untouched.
    pub fn save(&self) -> Result<()> {
        let snapshot_arc = self.all();
        let data = snapshot::encode(&snapshot_arc)?;
        self.blob.write(&data)
    }

    /// Add one record, validating its dimension against the store.
    pub fn append(&self, label: impl Into<String>, vector: Vec<f32>) -> Result<()> {
        let mut guard = self.records.write();

        let expected = guard.first().map(|r| r.vector.len()).or(self.expected_dim);
        if let Some(expected) = expected {
            if vector.len() != expected {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let mut next = (**guard).clone();
        next.push(EmbeddingRecord {
            label: label.into(),
            vector,
        });
        *guard = Arc::new(next);
        Ok(())
    }

    /// Replace the entire collection (retrain). Validates that all incoming
    /// vectors share one dimension before publishing anything.
    pub fn replace_all(&self, records: Vec<EmbeddingRecord>) -> Result<()> {
        let dim = records
            .first()
            .map(|r| r.vector.len())
            .or(self.expected_dim);
        if let Some(dim) = dim {
            for r in &records {
                if r.vector.len() != dim {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: dim,
                        actual: r.vector.len(),
                    });
                }
            }
        }

        let count = records.len();
        *self.records.write() = Arc::new(records);
        info!(records = count, "embedding store replaced");
        Ok(())
    }

    /// Snapshot of all records in insertion order.
    ///
    /// The returned `Arc` stays consistent even if the store is reloaded
    /// while the caller is iterating.
    pub fn all(&self) -> Arc<Vec<EmbeddingRecord>> {
        Arc::clone(&self.records.read())
    }

    /// Dimension of stored vectors. `None` while the store is empty and no
    /// expected dimension was configured.
    pub fn dimension(&self) -> Option<usize> {
        self.records
            .read()
            .first()
            .map(|r| r.vector.len())
            .or(self.expected_dim)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
