//! Error types for identity resolution orchestration.

use rollcall_embeddings::EmbeddingError;
use rollcall_ledger::LedgerError;

/// Errors surfaced by [`crate::IdentityResolutionService`].
///
/// "Not recognized" is never an error — it is a normal outcome
/// ([`crate::IdentifiedOutcome::NotRecognized`]). Only genuine
/// infrastructure or input problems land here.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// Embedding store, matcher, or extraction failure.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Attendance ledger persistence failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Result alias for resolution operations.
pub type Result<T> = std::result::Result<T, ResolutionError>;
