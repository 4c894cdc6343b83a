//! Shipment intake: a receipt records what arrived and what passed
//! inspection; accepting it stocks a new lot with the passed doses.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use vaxtrack_core::{DomainError, LotId, ReceiptId};

use crate::error::InventoryError;
use crate::lot::VaccineLot;
use crate::store::InventoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccineReceipt {
    pub id: ReceiptId,
    pub received_date: NaiveDate,
    pub vaccine: String,
    pub lot_number: String,
    pub quantity_sent: u32,
    pub quantity_received: u32,
    pub doses_passed: u32,
    pub doses_failed: u32,
    pub supplier: String,
    pub shipment_id: String,
    pub received_by: String,
    pub storage_temperature: String,
    pub expiration_date: NaiveDate,
    pub location: String,
    pub minimum_stock: u32,
    pub vaccine_family: String,
}

impl VaccineReceipt {
    /// Inspection math must add up: every received dose either passed or
    /// failed.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.vaccine.trim().is_empty() {
            return Err(DomainError::validation("vaccine cannot be empty"));
        }
        if self.lot_number.trim().is_empty() {
            return Err(DomainError::validation("lot number cannot be empty"));
        }
        if self.quantity_received == 0 {
            return Err(DomainError::validation("quantity received must be positive"));
        }
        if self.doses_passed + self.doses_failed != self.quantity_received {
            return Err(DomainError::invariant(format!(
                "doses passed ({}) + failed ({}) must equal quantity received ({})",
                self.doses_passed, self.doses_failed, self.quantity_received
            )));
        }
        Ok(())
    }
}

/// Accept a receipt: validate it and stock a new lot holding the doses that
/// passed inspection. Returns the created lot.
pub async fn accept_receipt(
    store: &dyn InventoryStore,
    receipt: &VaccineReceipt,
    now: DateTime<Utc>,
) -> Result<VaccineLot, InventoryError> {
    receipt.validate()?;

    let lot = VaccineLot::new(
        LotId::new(),
        receipt.vaccine.clone(),
        receipt.lot_number.clone(),
        receipt.doses_passed,
        receipt.expiration_date,
        receipt.location.clone(),
        receipt.minimum_stock,
        receipt.vaccine_family.clone(),
        now,
    )?;

    store.insert(lot.clone()).await?;
    tracing::info!(
        lot_id = %lot.id,
        lot_number = %lot.lot_number,
        doses = lot.quantity_on_hand,
        "stocked lot from receipt"
    );
    Ok(lot)
}
