//! Feature extraction seam and mock implementation.
//!
//! The real extraction model (face detection + embedding network) lives
//! outside this system; everything here consumes it through the
//! [`FeatureExtractor`] trait. Extraction failures are input problems, not
//! matcher failures, and are surfaced as [`EmbeddingError::Extraction`].

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::distance::l2_normalize;
use crate::errors::{EmbeddingError, Result};

/// Trait for extracting feature vectors from face images.
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    /// Extract a feature vector from raw image bytes.
    ///
    /// Fails with [`EmbeddingError::Extraction`] when no vector can be
    /// produced (no face detected, unreadable image).
    async fn extract(&self, image: &[u8]) -> Result<Vec<f32>>;

    /// Output vector dimensions.
    fn dimensions(&self) -> usize;
}

/// Mock extractor for testing.
///
/// Generates deterministic vectors by hashing the image bytes with SHA-256
/// and using the hash bytes as seeds for the components. Empty input is
/// treated as "no face detected".
pub struct MockFeatureExtractor {
    dims: usize,
}

impl MockFeatureExtractor {
    /// Create a new mock extractor with the given dimensions.
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn hash_to_vector(&self, image: &[u8]) -> Vec<f32> {
        let mut hasher = Sha256::new();
        hasher.update(image);
        let hash = hasher.finalize();

        let mut v: Vec<f32> = (0..self.dims)
            .map(|i| {
                let byte_idx = i % hash.len();
                // Map byte to [-1, 1] range
                (f32::from(hash[byte_idx]) / 127.5) - 1.0
            })
            .collect();

        l2_normalize(&mut v);
        v
    }
}

#[async_trait]
impl FeatureExtractor for MockFeatureExtractor {
    async fn extract(&self, image: &[u8]) -> Result<Vec<f32>> {
        if image.is_empty() {
            return Err(EmbeddingError::Extraction("no face detected".into()));
        }
        Ok(self.hash_to_vector(image))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}
