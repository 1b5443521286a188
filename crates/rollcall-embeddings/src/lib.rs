//! # rollcall-embeddings
//!
//! Face embedding storage and nearest-neighbor identity matching.
//!
//! - Labeled feature vectors held in memory, persisted through an opaque
//!   [`blob::BlobStore`] as a versioned binary snapshot
//! - Brute-force Euclidean scan with a strict distance threshold and
//!   first-seen-wins tie-break
//! - [`extract::FeatureExtractor`] seam for the upstream embedding model,
//!   with a deterministic SHA-256 mock for tests
//!
//! ## Crate Position
//!
//! Depends only on rollcall-core. Depended on by: rollcall-service.

#![deny(unsafe_code)]

pub mod blob;
pub mod distance;
pub mod enroll;
pub mod errors;
pub mod extract;
pub mod matcher;
pub mod snapshot;
pub mod store;

pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use distance::{euclidean_distance, l2_norm, l2_normalize};
pub use enroll::{EnrollmentItem, EnrollmentReport, enroll_batch};
pub use errors::{EmbeddingError, Result};
pub use extract::{FeatureExtractor, MockFeatureExtractor};
pub use matcher::{MatchOutcome, Matcher};
pub use store::{EmbeddingRecord, EmbeddingStore};
