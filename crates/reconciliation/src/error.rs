use core::fmt;

use serde::Serialize;
use thiserror::Error;

use vaxtrack_core::LotId;
use vaxtrack_inventory::StoreError;

use crate::session::Phase;

/// One commit-blocking problem found by `validate_for_commit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    MonthNotSet,
    MissingCounts { entries: usize },
    MissingReasons { entries: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MonthNotSet => write!(f, "no reconciliation month selected"),
            Violation::MissingCounts { entries } => {
                write!(f, "{entries} lots are missing physical counts")
            }
            Violation::MissingReasons { entries } => {
                write!(f, "{entries} lots with discrepancies need explanations")
            }
        }
    }
}

/// One per-lot write that failed during commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedWrite {
    pub lot_id: LotId,
    #[serde(serialize_with = "error_as_string")]
    pub error: StoreError,
}

fn error_as_string<S: serde::Serializer>(error: &StoreError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

/// Outcome detail of a commit where some per-lot writes landed and some did
/// not. Succeeded lots are final in the store; failed lots keep their
/// attempted counts in the session so only they need retrying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialCommit {
    pub succeeded: Vec<LotId>,
    pub failed: Vec<FailedWrite>,
}

impl fmt::Display for PartialCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lots updated, {} failed",
            self.succeeded.len(),
            self.failed.len()
        )
    }
}

/// Engine-level failure. Every variant aborts the requested operation and
/// leaves session state unchanged, except `PartialCommit`, which leaves state
/// precisely describing which lots still need correction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconciliationError {
    /// Malformed input at the API boundary (reject-and-report, never coerce).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation referenced a lot not in the current session.
    #[error("lot {0} is not part of this reconciliation session")]
    UnknownLot(LotId),

    /// Operation invoked in the wrong workflow phase.
    #[error("operation requires the {required:?} phase, session is in {actual:?}")]
    Phase { required: Phase, actual: Phase },

    /// Commit invoked while validation still reports violations; carries the
    /// full list, never just the first.
    #[error("cannot commit: {}", format_violations(.0))]
    Validation(Vec<Violation>),

    /// A subset of per-lot writes failed during commit.
    #[error("commit partially failed: {0}")]
    PartialCommit(PartialCommit),

    /// A store failure outside the per-lot commit fan-out (e.g. the initial
    /// inventory read).
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
