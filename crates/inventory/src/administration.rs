//! Dose administration: drawing doses from a lot for patients.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use vaxtrack_core::{DomainError, LotId, RecordId};

use crate::error::InventoryError;
use crate::store::InventoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministrationRecord {
    pub id: RecordId,
    pub lot_id: LotId,
    pub administered_date: NaiveDate,
    pub doses_used: u32,
    pub patient_age_group: String,
    pub administered_by: String,
    pub location: String,
}

/// Record an administration and decrement the lot.
///
/// Rejects zero doses and drawing more than the lot has on hand; the write
/// carries the version read here, so a concurrent mutation of the same lot
/// surfaces as a store conflict instead of a lost update.
pub async fn administer_doses(
    store: &dyn InventoryStore,
    record: &AdministrationRecord,
    now: DateTime<Utc>,
) -> Result<u32, InventoryError> {
    if record.doses_used == 0 {
        return Err(DomainError::validation("doses used must be positive").into());
    }

    let lot = store.get(record.lot_id).await?;
    if record.doses_used > lot.quantity_on_hand {
        return Err(DomainError::invariant(format!(
            "only {} doses available in lot {}",
            lot.quantity_on_hand, lot.lot_number
        ))
        .into());
    }

    let remaining = lot.quantity_on_hand - record.doses_used;
    store
        .update_quantity(record.lot_id, remaining, lot.version, now)
        .await?;

    tracing::info!(
        lot_id = %record.lot_id,
        doses = record.doses_used,
        remaining,
        "administered doses"
    );
    Ok(remaining)
}
