//! # rollcall-ledger
//!
//! Append-only attendance event log on `SQLite`.
//!
//! Every recognition event is recorded — deduplication is a read-time
//! concern. [`AttendanceLedger::earliest_per_identity`] derives the
//! "first sighting of the day" report from the full log on every call.
//!
//! ## Crate Position
//!
//! Depends only on rollcall-core. Depended on by: rollcall-service.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod event;
pub mod ledger;
pub mod migrations;

pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection};
pub use errors::{LedgerError, Result};
pub use event::AttendanceEvent;
pub use ledger::AttendanceLedger;
