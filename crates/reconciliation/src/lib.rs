//! Monthly physical-vs-system inventory reconciliation.
//!
//! The [`ReconciliationEngine`] owns a three-phase workflow (setup, counting,
//! review/commit): it captures a physical count per lot, derives variances
//! against the recorded system counts, demands an explanation for every
//! discrepancy, and commits corrected quantities back to the inventory store
//! with an explicit partial-failure contract.

pub mod engine;
pub mod error;
pub mod session;

pub use engine::{CommitResult, ReconciliationEngine};
pub use error::{FailedWrite, PartialCommit, ReconciliationError, Violation};
pub use session::{Phase, ReconciliationEntry, ReconciliationSession, Summary};
