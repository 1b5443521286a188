//! Typed attendance event and its repository.
//!
//! Parsing and validation happen once, here at the persistence boundary —
//! consumers work with `NaiveDate`/`NaiveTime`, never raw strings.

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S%.f";

/// One recorded recognition event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    /// Monotonically increasing id assigned at append time. Total order
    /// over all events, independent of wall-clock precision.
    pub seq: i64,
    /// Recognized identity.
    pub label: String,
    /// Caller-supplied calendar date. The ledger never derives "today"
    /// itself, so no timezone assumption is baked in.
    pub date: NaiveDate,
    /// Caller-supplied time of day.
    pub time: NaiveTime,
    /// UTC instant the row was written. Audit only — dedup keys on the
    /// caller-supplied values above.
    pub recorded_at: String,
}

/// Attendance event repository — stateless, every method takes `&Connection`.
pub struct EventRepo;

impl EventRepo {
    /// Insert one event; returns its assigned sequence id.
    pub fn insert(
        conn: &Connection,
        label: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<i64> {
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO attendance_events (label, date, time, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                label,
                date.format(DATE_FMT).to_string(),
                time.format(TIME_FMT).to_string(),
                now
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All events, optionally filtered to one date, in sequence order.
    pub fn list(conn: &Connection, date: Option<NaiveDate>) -> Result<Vec<AttendanceEvent>> {
        let mut rows = Vec::new();
        match date {
            Some(date) => {
                let mut stmt = conn.prepare(
                    "SELECT seq, label, date, time, recorded_at FROM attendance_events
                     WHERE date = ?1 ORDER BY seq",
                )?;
                let mapped = stmt.query_map(
                    params![date.format(DATE_FMT).to_string()],
                    Self::map_raw_row,
                )?;
                for row in mapped {
                    rows.push(Self::parse_row(row?)?);
                }
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT seq, label, date, time, recorded_at FROM attendance_events
                     ORDER BY seq",
                )?;
                let mapped = stmt.query_map([], Self::map_raw_row)?;
                for row in mapped {
                    rows.push(Self::parse_row(row?)?);
                }
            }
        }
        Ok(rows)
    }

    /// Delete every event for an identity. Returns rows removed.
    pub fn delete_by_label(conn: &Connection, label: &str) -> Result<usize> {
        let deleted = conn.execute(
            "DELETE FROM attendance_events WHERE label = ?1",
            params![label],
        )?;
        Ok(deleted)
    }

    /// Total event count.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM attendance_events", [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    fn map_raw_row(
        row: &rusqlite::Row<'_>,
    ) -> rusqlite::Result<(i64, String, String, String, String)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
        ))
    }

    fn parse_row(raw: (i64, String, String, String, String)) -> Result<AttendanceEvent> {
        let (seq, label, date, time, recorded_at) = raw;
        let date = NaiveDate::parse_from_str(&date, DATE_FMT).map_err(|e| {
            LedgerError::CorruptRow {
                seq,
                detail: format!("date '{date}': {e}"),
            }
        })?;
        let time = NaiveTime::parse_from_str(&time, TIME_FMT).map_err(|e| {
            LedgerError::CorruptRow {
                seq,
                detail: format!("time '{time}': {e}"),
            }
        })?;
        Ok(AttendanceEvent {
            seq,
            label,
            date,
            time,
            recorded_at,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
