//! Loss reporting: doses removed from stock for reasons other than
//! administration (expiry, breakage, temperature excursions, ...).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use vaxtrack_core::{DomainError, LotId, RecordId};

use crate::error::InventoryError;
use crate::store::InventoryStore;

/// Whether the loss could have been avoided with better handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WastageClass {
    Preventable,
    NonPreventable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossRecord {
    pub id: RecordId,
    pub lot_id: LotId,
    pub reported_date: NaiveDate,
    pub quantity: u32,
    pub reason: String,
    pub estimated_value: f64,
    pub reported_by: String,
    pub description: String,
    pub wastage_type: WastageClass,
}

/// Record a loss and decrement the lot. Same guards as administration: the
/// quantity must be positive and cannot exceed what is on hand.
pub async fn record_loss(
    store: &dyn InventoryStore,
    record: &LossRecord,
    now: DateTime<Utc>,
) -> Result<u32, InventoryError> {
    if record.quantity == 0 {
        return Err(DomainError::validation("loss quantity must be positive").into());
    }
    if record.reason.trim().is_empty() {
        return Err(DomainError::validation("loss reason cannot be empty").into());
    }

    let lot = store.get(record.lot_id).await?;
    if record.quantity > lot.quantity_on_hand {
        return Err(DomainError::invariant(format!(
            "cannot report loss of {} doses, lot {} has {}",
            record.quantity, lot.lot_number, lot.quantity_on_hand
        ))
        .into());
    }

    let remaining = lot.quantity_on_hand - record.quantity;
    store
        .update_quantity(record.lot_id, remaining, lot.version, now)
        .await?;

    tracing::info!(
        lot_id = %record.lot_id,
        doses = record.quantity,
        reason = %record.reason,
        remaining,
        "recorded vaccine loss"
    );
    Ok(remaining)
}
