use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use vaxtrack_core::LotId;

use crate::lot::{LotSnapshot, VaccineLot};

/// Store-side failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transport-level failure; the operation may succeed on retry.
    #[error("inventory store unavailable: {0}")]
    Unavailable(String),

    /// The referenced lot no longer exists.
    #[error("lot {0} not found")]
    NotFound(LotId),

    /// The write carried a stale version; someone else touched the lot since
    /// it was read.
    #[error("version conflict on lot {lot_id}: expected {expected}, found {found}")]
    Conflict {
        lot_id: LotId,
        expected: u64,
        found: u64,
    },
}

impl StoreError {
    /// Transient failures are worth one retry; conflicts and missing lots
    /// are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// The inventory system of record, as consumed by the workflows in this crate
/// and by the reconciliation engine.
///
/// Quantity writes carry the version the caller last read; a stale version
/// fails with [`StoreError::Conflict`] instead of silently overwriting.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Snapshot every lot currently on record.
    async fn list_all(&self) -> Result<Vec<LotSnapshot>, StoreError>;

    /// Fetch one lot in full.
    async fn get(&self, lot_id: LotId) -> Result<VaccineLot, StoreError>;

    /// Add a new lot (receiving).
    async fn insert(&self, lot: VaccineLot) -> Result<(), StoreError>;

    /// Overwrite one lot's quantity, stamping `updated_at` and bumping the
    /// version. Fails with `Conflict` when `expected_version` is stale.
    async fn update_quantity(
        &self,
        lot_id: LotId,
        new_quantity: u32,
        expected_version: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
