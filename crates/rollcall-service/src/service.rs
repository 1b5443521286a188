//! Identity resolution and attendance recording.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{info, instrument};

use rollcall_core::RecognitionConfig;
use rollcall_embeddings::{
    EmbeddingRecord, EmbeddingStore, EnrollmentItem, EnrollmentReport, FeatureExtractor,
    MatchOutcome, Matcher, enroll_batch,
};
use rollcall_ledger::{AttendanceEvent, AttendanceLedger};

use crate::errors::Result;

/// Outcome of a recognition request.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentifiedOutcome {
    /// A known identity matched and the sighting was recorded.
    Matched {
        /// Resolved identity.
        label: String,
        /// Time of day recorded in the ledger.
        time: NaiveTime,
    },
    /// Nobody matched. Valid result — the ledger is untouched.
    NotRecognized,
}

/// Orchestrates matcher and ledger for recognition requests.
pub struct IdentityResolutionService {
    store: Arc<EmbeddingStore>,
    matcher: Matcher,
    ledger: Arc<AttendanceLedger>,
    config: RecognitionConfig,
}

impl IdentityResolutionService {
    /// Create a service over a store and ledger.
    pub fn new(
        store: Arc<EmbeddingStore>,
        ledger: Arc<AttendanceLedger>,
        config: RecognitionConfig,
    ) -> Self {
        let matcher = Matcher::new(Arc::clone(&store));
        Self {
            store,
            matcher,
            ledger,
            config,
        }
    }

    /// Open a service from configuration: file-backed embedding snapshot
    /// (loaded if present) and ledger database (migrated).
    pub fn open(config: RecognitionConfig) -> Result<Self> {
        let blob = Box::new(rollcall_embeddings::FileBlobStore::new(&config.snapshot_path));
        let store = Arc::new(EmbeddingStore::from_config(blob, &config));
        store.load()?;

        let pool = rollcall_ledger::connection::new_from_config(
            &config,
            &rollcall_ledger::ConnectionConfig::default(),
        )?;
        {
            let conn = pool.get().map_err(rollcall_ledger::LedgerError::from)?;
            rollcall_ledger::migrations::run_migrations(&conn)?;
        }
        let ledger = Arc::new(AttendanceLedger::new(pool));

        Ok(Self::new(store, ledger, config))
    }

    /// Resolve a query vector and, on a positive match, record the sighting.
    ///
    /// `now` is caller-supplied — the service never derives the date
    /// internally, so the day boundary is the caller's policy. No retries:
    /// a storage failure on the append is surfaced immediately, because a
    /// resolved-but-unrecorded match is unacceptable. On `NotRecognized`
    /// the ledger is never touched.
    #[instrument(skip(self, query), fields(dim = query.len()))]
    pub fn identify_and_record(
        &self,
        query: &[f32],
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<IdentifiedOutcome> {
        match self.matcher.resolve(query, self.config.match_threshold)? {
            MatchOutcome::Identified { label, distance } => {
                let seq = self.ledger.append(&label, date, time)?;
                info!(label = %label, %distance, seq, "recognition recorded");
                Ok(IdentifiedOutcome::Matched { label, time })
            }
            MatchOutcome::Unknown => Ok(IdentifiedOutcome::NotRecognized),
        }
    }

    /// Enroll images for one identity: extract, append, persist.
    ///
    /// Per-image failures are collected in the report rather than aborting
    /// the batch. The snapshot is saved only when at least one vector was
    /// added.
    pub async fn enroll(
        &self,
        extractor: &dyn FeatureExtractor,
        label: &str,
        images: Vec<Vec<u8>>,
    ) -> Result<EnrollmentReport> {
        let items = images
            .into_iter()
            .map(|image| EnrollmentItem {
                label: label.to_string(),
                image,
            })
            .collect();

        let report = enroll_batch(extractor, &self.store, items).await?;
        if !report.enrolled.is_empty() {
            self.store.save()?;
        }
        Ok(report)
    }

    /// Replace the entire embedding set and persist it (retrain).
    pub fn retrain(&self, records: Vec<EmbeddingRecord>) -> Result<()> {
        self.store.replace_all(records)?;
        self.store.save()?;
        Ok(())
    }

    /// Reload the embedding set from persisted storage.
    pub fn reload(&self) -> Result<()> {
        self.store.load()?;
        Ok(())
    }

    /// First sighting of the day per identity, sorted by (date, label) for
    /// a deterministic reporting surface.
    pub fn attendance_report(&self, date: Option<NaiveDate>) -> Result<Vec<AttendanceEvent>> {
        let mut events: Vec<AttendanceEvent> = self
            .ledger
            .earliest_per_identity(date)?
            .into_values()
            .collect();
        events.sort_by(|a, b| (a.date, &a.label).cmp(&(b.date, &b.label)));
        Ok(events)
    }

    /// Remove all attendance events for an identity (administrative).
    pub fn purge_identity(&self, label: &str) -> Result<usize> {
        Ok(self.ledger.purge_identity(label)?)
    }

    /// The configuration this service runs with.
    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rollcall_embeddings::{EmbeddingError, MemoryBlobStore};
    use rollcall_ledger::connection::{self, ConnectionConfig};
    use rollcall_ledger::migrations::run_migrations;

    fn setup(threshold: f32) -> IdentityResolutionService {
        let store = Arc::new(EmbeddingStore::new(Box::new(MemoryBlobStore::new())));
        let pool = connection::new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            run_migrations(&conn).unwrap();
        }
        let ledger = Arc::new(AttendanceLedger::new(pool));
        let config = RecognitionConfig {
            match_threshold: threshold,
            ..RecognitionConfig::default()
        };
        IdentityResolutionService::new(store, ledger, config)
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M:%S").unwrap()
    }

    #[test]
    fn match_records_attendance() {
        let service = setup(0.9);
        service.store.append("alice", vec![0.0, 0.0, 0.0]).unwrap();

        let outcome = service
            .identify_and_record(&[0.1, 0.1, 0.1], d("2026-08-30"), t("09:00:00"))
            .unwrap();

        assert_matches!(outcome, IdentifiedOutcome::Matched { ref label, time }
            if label == "alice" && time == t("09:00:00"));
        assert_eq!(service.ledger.count().unwrap(), 1);
    }

    #[test]
    fn unknown_leaves_ledger_untouched() {
        let service = setup(0.1);
        service.store.append("alice", vec![0.0, 0.0, 0.0]).unwrap();

        let outcome = service
            .identify_and_record(&[5.0, 5.0, 5.0], d("2026-08-30"), t("09:00:00"))
            .unwrap();

        assert_eq!(outcome, IdentifiedOutcome::NotRecognized);
        assert_eq!(service.ledger.count().unwrap(), 0);
    }

    #[test]
    fn dimension_mismatch_surfaces_as_error() {
        let service = setup(0.9);
        service.store.append("alice", vec![0.0; 4]).unwrap();

        let err = service
            .identify_and_record(&[0.0; 3], d("2026-08-30"), t("09:00:00"))
            .unwrap_err();
        assert_matches!(
            err,
            crate::ResolutionError::Embedding(EmbeddingError::DimensionMismatch { .. })
        );
        assert_eq!(service.ledger.count().unwrap(), 0);
    }

    #[test]
    fn empty_store_is_not_recognized() {
        let service = setup(0.9);
        let outcome = service
            .identify_and_record(&[1.0, 2.0], d("2026-08-30"), t("09:00:00"))
            .unwrap();
        assert_eq!(outcome, IdentifiedOutcome::NotRecognized);
    }

    #[test]
    fn retrain_replaces_and_persists() {
        let service = setup(0.9);
        service.store.append("old", vec![1.0]).unwrap();

        service
            .retrain(vec![EmbeddingRecord {
                label: "new".into(),
                vector: vec![2.0],
            }])
            .unwrap();

        service.reload().unwrap();
        let all = service.store.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].label, "new");
    }

    #[test]
    fn attendance_report_is_sorted_and_deduped() {
        let service = setup(0.9);
        service.ledger.append("bob", d("2026-08-30"), t("10:00:00")).unwrap();
        service.ledger.append("alice", d("2026-08-30"), t("09:00:00")).unwrap();
        service.ledger.append("alice", d("2026-08-30"), t("08:30:00")).unwrap();

        let report = service.attendance_report(Some(d("2026-08-30"))).unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].label, "alice");
        assert_eq!(report[0].time, t("08:30:00"));
        assert_eq!(report[1].label, "bob");
    }

    #[tokio::test]
    async fn enroll_persists_successful_vectors() {
        use rollcall_embeddings::MockFeatureExtractor;

        let service = setup(0.9);
        let extractor = MockFeatureExtractor::new(32);

        let report = service
            .enroll(&extractor, "alice", vec![b"img-1".to_vec(), b"img-2".to_vec()])
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(service.store.len(), 2);

        // Saved snapshot reloads to the same set
        service.store.replace_all(vec![]).unwrap();
        service.reload().unwrap();
        assert_eq!(service.store.len(), 2);
    }

    #[test]
    fn open_builds_working_service_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = RecognitionConfig {
            snapshot_path: dir.path().join("embeddings.bin"),
            ledger_path: dir.path().join("attendance.db"),
            ..RecognitionConfig::default()
        };

        let service = IdentityResolutionService::open(config.clone()).unwrap();
        service.store.append("alice", vec![0.0, 0.0]).unwrap();
        service.store.save().unwrap();
        service
            .identify_and_record(&[0.1, 0.1], d("2026-08-30"), t("09:00:00"))
            .unwrap();

        // Reopening sees both the snapshot and the recorded event
        let reopened = IdentityResolutionService::open(config).unwrap();
        assert_eq!(reopened.store.len(), 1);
        assert_eq!(reopened.ledger.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn enroll_reports_extraction_failures() {
        use rollcall_embeddings::MockFeatureExtractor;

        let service = setup(0.9);
        let extractor = MockFeatureExtractor::new(32);

        let report = service
            .enroll(&extractor, "alice", vec![b"img".to_vec(), Vec::new()])
            .await
            .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.enrolled.len(), 1);
        assert_eq!(report.failures.len(), 1);
    }
}
