//! # rollcall-service
//!
//! Orchestration layer: validates a query vector, resolves it against the
//! embedding store, and records a positive match in the attendance ledger.
//!
//! ## Crate Position
//!
//! Top of the stack. Depends on rollcall-core, rollcall-embeddings, and
//! rollcall-ledger.

#![deny(unsafe_code)]

pub mod errors;
pub mod service;

pub use errors::{ResolutionError, Result};
pub use service::{IdentifiedOutcome, IdentityResolutionService};
