//! Nearest-neighbor identity resolution.
//!
//! Brute-force Euclidean scan over the store. O(N·D) per query — at
//! enrollment scale (hundreds of people, a handful of vectors each) an ANN
//! index buys nothing; if one is ever added it must preserve the exact
//! match/no-match decision within floating-point tolerance.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::distance::euclidean_distance;
use crate::errors::{EmbeddingError, Result};
use crate::store::EmbeddingStore;

/// Outcome of resolving a query vector.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A stored vector was strictly closer than the threshold.
    Identified {
        /// Label of the best record.
        label: String,
        /// Euclidean distance to that record.
        distance: f32,
    },
    /// No stored vector was close enough. This is a valid result, not an
    /// error.
    Unknown,
}

/// Resolves query vectors against an [`EmbeddingStore`].
pub struct Matcher {
    store: Arc<EmbeddingStore>,
}

impl Matcher {
    /// Create a matcher over the given store.
    pub fn new(store: Arc<EmbeddingStore>) -> Self {
        Self { store }
    }

    /// Find the closest stored identity under `threshold`.
    ///
    /// Scans every record in insertion order tracking the strict running
    /// minimum — a later record at an equal distance never displaces the
    /// current best, so ties resolve to the earliest-enrolled record and
    /// repeated calls are deterministic.
    ///
    /// A distance exactly equal to `threshold` is NOT a match. An empty
    /// store always yields [`MatchOutcome::Unknown`]. A query whose length
    /// disagrees with the store dimension fails with `DimensionMismatch`
    /// before any scanning.
    #[instrument(skip(self, query), fields(dim = query.len()))]
    pub fn resolve(&self, query: &[f32], threshold: f32) -> Result<MatchOutcome> {
        let records = self.store.all();

        let Some(first) = records.first() else {
            debug!("empty store, no possible match");
            return Ok(MatchOutcome::Unknown);
        };
        if query.len() != first.vector.len() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: first.vector.len(),
                actual: query.len(),
            });
        }

        let mut best: Option<(&str, f32)> = None;
        for record in records.iter() {
            let dist = euclidean_distance(query, &record.vector);
            // Strict < on both counts: equal distance keeps the earlier
            // record, and dist == threshold is a non-match.
            if dist < threshold && best.is_none_or(|(_, min)| dist < min) {
                best = Some((&record.label, dist));
            }
        }

        match best {
            Some((label, distance)) => {
                debug!(label, %distance, "identified");
                Ok(MatchOutcome::Identified {
                    label: label.to_string(),
                    distance,
                })
            }
            None => Ok(MatchOutcome::Unknown),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
