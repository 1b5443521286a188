//! Bulk enrollment: extract vectors from a batch of labeled images.
//!
//! Every item gets an explicit per-item result collected into a report —
//! a failed image never silently disappears from the enrollment run, and
//! one bad image never aborts the rest of the batch.

use tracing::{info, warn};

use crate::errors::{EmbeddingError, Result};
use crate::extract::FeatureExtractor;
use crate::store::EmbeddingStore;

/// One image submitted for enrollment.
pub struct EnrollmentItem {
    /// Identity the image belongs to.
    pub label: String,
    /// Raw image bytes.
    pub image: Vec<u8>,
}

/// Outcome of a bulk enrollment run.
#[derive(Debug, Default)]
pub struct EnrollmentReport {
    /// Labels whose vectors were appended, in submission order.
    pub enrolled: Vec<String>,
    /// Per-item failures: (label, error).
    pub failures: Vec<(String, EmbeddingError)>,
}

impl EnrollmentReport {
    /// Whether every submitted item was enrolled.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run the extractor over each item and append successful vectors to the
/// store.
///
/// Extraction failures and dimension mismatches are recorded per item; the
/// store is only touched for items that extract cleanly. The caller decides
/// when to [`EmbeddingStore::save`] the result.
pub async fn enroll_batch(
    extractor: &dyn FeatureExtractor,
    store: &EmbeddingStore,
    items: Vec<EnrollmentItem>,
) -> Result<EnrollmentReport> {
    let mut report = EnrollmentReport::default();

    for item in items {
        match extractor.extract(&item.image).await {
            Ok(vector) => match store.append(item.label.clone(), vector) {
                Ok(()) => report.enrolled.push(item.label),
                Err(e) => {
                    warn!(label = %item.label, error = %e, "enrollment append rejected");
                    report.failures.push((item.label, e));
                }
            },
            Err(e) => {
                warn!(label = %item.label, error = %e, "feature extraction failed");
                report.failures.push((item.label, e));
            }
        }
    }

    info!(
        enrolled = report.enrolled.len(),
        failed = report.failures.len(),
        "enrollment batch finished"
    );
    Ok(report)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
