//! High-level `AttendanceLedger` API.
//!
//! Appends are the single serialization point: an in-process write mutex
//! plus `SQLite`'s own locking guarantee that no two appends ever receive
//! the same sequence id. Reads take no lock and recompute their view from
//! the full log on every call — nothing is cached stale.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, instrument};

use crate::connection::{ConnectionPool, PooledConnection};
use crate::errors::{LedgerError, Result};
use crate::event::{AttendanceEvent, EventRepo};

/// Append-only log of recognition events with deduplicating read views.
pub struct AttendanceLedger {
    pool: ConnectionPool,
    write_lock: Mutex<()>,
}

impl AttendanceLedger {
    const SQLITE_BUSY_MAX_RETRIES: u32 = 32;

    /// Create a ledger over the given connection pool. The caller runs
    /// migrations before handing the pool in.
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    fn with_write_lock<T>(&self, f: impl FnMut() -> Result<T>) -> Result<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| LedgerError::Internal("write lock poisoned".into()))?;
        Self::retry_on_sqlite_busy(f)
    }

    /// Retry an operation on `SQLite` BUSY/LOCKED with linear backoff + jitter.
    fn retry_on_sqlite_busy<T>(mut f: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempts = 0;

        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(err)
                    if Self::is_sqlite_busy_or_locked(&err)
                        && attempts < Self::SQLITE_BUSY_MAX_RETRIES =>
                {
                    attempts += 1;
                    let base_ms = u64::from(attempts).saturating_mul(10).min(500);
                    let jitter_range = base_ms / 4;
                    let jitter = if jitter_range > 0 {
                        rand::random::<u64>() % (jitter_range * 2 + 1)
                    } else {
                        0
                    };
                    let backoff_ms = base_ms.saturating_sub(jitter_range) + jitter;
                    std::thread::sleep(Duration::from_millis(backoff_ms));
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn is_sqlite_busy_or_locked(err: &LedgerError) -> bool {
        match err {
            LedgerError::Sqlite(rusqlite::Error::SqliteFailure(code, _)) => matches!(
                code.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Record one recognition event; returns its sequence id.
    ///
    /// Duplicate (label, date) pairs are permitted by design — every
    /// recognition is kept for audit, and dedup happens at read time. An
    /// accepted append is durable: storage failures surface as errors,
    /// never as silent drops.
    #[instrument(skip(self), fields(label))]
    pub fn append(&self, label: &str, date: NaiveDate, time: NaiveTime) -> Result<i64> {
        let seq = self.with_write_lock(|| {
            let conn = self.conn()?;
            EventRepo::insert(&conn, label, date, time)
        })?;
        debug!(label, seq, "attendance event appended");
        Ok(seq)
    }

    /// All events, optionally filtered to one date, in sequence order.
    pub fn events_on(&self, date: Option<NaiveDate>) -> Result<Vec<AttendanceEvent>> {
        let conn = self.conn()?;
        EventRepo::list(&conn, date)
    }

    /// First sighting of the day per identity.
    ///
    /// Groups events by (label, date) and keeps the one with the smallest
    /// (time, seq) pair — identical times resolve to the earliest recorded
    /// event. Recomputed from the full log on every call.
    pub fn earliest_per_identity(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<HashMap<(String, NaiveDate), AttendanceEvent>> {
        let events = self.events_on(date)?;

        let mut earliest: HashMap<(String, NaiveDate), AttendanceEvent> = HashMap::new();
        for event in events {
            let key = (event.label.clone(), event.date);
            match earliest.get(&key) {
                // Iteration is in seq order, so a strict < on time keeps the
                // smaller seq among equal times automatically.
                Some(current) if event.time >= current.time => {}
                _ => {
                    let _ = earliest.insert(key, event);
                }
            }
        }
        Ok(earliest)
    }

    /// Remove every event for an identity (administrative). Returns rows
    /// removed. Sequence ids of remaining and future events are unaffected.
    #[instrument(skip(self), fields(label))]
    pub fn purge_identity(&self, label: &str) -> Result<usize> {
        self.with_write_lock(|| {
            let conn = self.conn()?;
            EventRepo::delete_by_label(&conn, label)
        })
    }

    /// Total number of recorded events.
    pub fn count(&self) -> Result<i64> {
        let conn = self.conn()?;
        EventRepo::count(&conn)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::connection::{self, ConnectionConfig};
    use crate::migrations::run_migrations;
    use std::sync::Arc;

    fn setup() -> AttendanceLedger {
        let pool = connection::new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            run_migrations(&conn).unwrap();
        }
        AttendanceLedger::new(pool)
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M:%S").unwrap()
    }

    // ── Append ────────────────────────────────────────────────────────

    #[test]
    fn append_returns_strictly_increasing_seq() {
        let ledger = setup();
        let s1 = ledger.append("alice", d("2026-08-30"), t("09:00:00")).unwrap();
        let s2 = ledger.append("alice", d("2026-08-30"), t("09:00:00")).unwrap();
        let s3 = ledger.append("bob", d("2026-08-30"), t("09:01:00")).unwrap();
        assert!(s1 < s2 && s2 < s3);
    }

    #[test]
    fn duplicate_label_date_pairs_are_stored() {
        let ledger = setup();
        ledger.append("alice", d("2026-08-30"), t("09:00:00")).unwrap();
        ledger.append("alice", d("2026-08-30"), t("10:00:00")).unwrap();

        // Write-time keeps everything for audit
        assert_eq!(ledger.count().unwrap(), 2);
    }

    #[test]
    fn concurrent_appends_never_share_a_seq() {
        const THREADS: usize = 10;
        const PER_THREAD: usize = 100;

        let ledger = Arc::new(setup());
        let start = ledger.append("seed", d("2026-08-30"), t("00:00:00")).unwrap();

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| {
                            ledger
                                .append(&format!("worker-{i}"), d("2026-08-30"), t("09:00:00"))
                                .unwrap()
                        })
                        .collect::<Vec<i64>>()
                })
            })
            .collect();

        let mut seqs: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        seqs.sort_unstable();
        seqs.dedup();

        // N unique ids, exactly the contiguous range after the seed
        assert_eq!(seqs.len(), THREADS * PER_THREAD);
        assert_eq!(seqs[0], start + 1);
        assert_eq!(*seqs.last().unwrap(), start + (THREADS * PER_THREAD) as i64);
    }

    // ── Reads ─────────────────────────────────────────────────────────

    #[test]
    fn events_on_filters_and_orders() {
        let ledger = setup();
        ledger.append("alice", d("2026-08-29"), t("09:00:00")).unwrap();
        ledger.append("bob", d("2026-08-30"), t("08:00:00")).unwrap();
        ledger.append("alice", d("2026-08-30"), t("07:00:00")).unwrap();

        let all = ledger.events_on(None).unwrap();
        assert_eq!(all.len(), 3);

        let today = ledger.events_on(Some(d("2026-08-30"))).unwrap();
        assert_eq!(today.len(), 2);
        assert_eq!(today[0].label, "bob"); // storage order, not time order
        assert_eq!(today[1].label, "alice");
    }

    #[test]
    fn earliest_per_identity_picks_smallest_time_not_first_recorded() {
        let ledger = setup();
        // Recorded out of order: 09:00 first, then 08:30
        ledger.append("alice", d("2026-08-30"), t("09:00:00")).unwrap();
        ledger.append("alice", d("2026-08-30"), t("08:30:00")).unwrap();

        let report = ledger.earliest_per_identity(Some(d("2026-08-30"))).unwrap();
        let event = &report[&("alice".to_string(), d("2026-08-30"))];
        assert_eq!(event.time, t("08:30:00"));
    }

    #[test]
    fn earliest_per_identity_ties_break_by_smaller_seq() {
        let ledger = setup();
        let s1 = ledger.append("alice", d("2026-08-30"), t("08:30:00")).unwrap();
        let s2 = ledger.append("alice", d("2026-08-30"), t("08:30:00")).unwrap();
        assert!(s1 < s2);

        let report = ledger.earliest_per_identity(Some(d("2026-08-30"))).unwrap();
        assert_eq!(report[&("alice".to_string(), d("2026-08-30"))].seq, s1);
    }

    #[test]
    fn earliest_per_identity_groups_across_dates_and_labels() {
        let ledger = setup();
        ledger.append("alice", d("2026-08-29"), t("09:15:00")).unwrap();
        ledger.append("alice", d("2026-08-30"), t("08:45:00")).unwrap();
        ledger.append("bob", d("2026-08-30"), t("10:00:00")).unwrap();
        ledger.append("bob", d("2026-08-30"), t("09:59:00")).unwrap();

        let report = ledger.earliest_per_identity(None).unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(
            report[&("alice".to_string(), d("2026-08-29"))].time,
            t("09:15:00")
        );
        assert_eq!(
            report[&("bob".to_string(), d("2026-08-30"))].time,
            t("09:59:00")
        );
    }

    #[test]
    fn earliest_per_identity_is_idempotent() {
        let ledger = setup();
        ledger.append("alice", d("2026-08-30"), t("09:00:00")).unwrap();
        ledger.append("alice", d("2026-08-30"), t("08:30:00")).unwrap();
        ledger.append("bob", d("2026-08-30"), t("09:30:00")).unwrap();

        let first = ledger.earliest_per_identity(None).unwrap();
        let second = ledger.earliest_per_identity(None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn earliest_per_identity_empty_ledger() {
        let ledger = setup();
        let report = ledger.earliest_per_identity(None).unwrap();
        assert!(report.is_empty());
    }

    // ── Purge ─────────────────────────────────────────────────────────

    #[test]
    fn purge_identity_removes_only_that_label() {
        let ledger = setup();
        ledger.append("alice", d("2026-08-29"), t("09:00:00")).unwrap();
        ledger.append("alice", d("2026-08-30"), t("09:00:00")).unwrap();
        ledger.append("bob", d("2026-08-30"), t("09:00:00")).unwrap();

        let removed = ledger.purge_identity("alice").unwrap();
        assert_eq!(removed, 2);

        let remaining = ledger.events_on(None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].label, "bob");
    }
}
