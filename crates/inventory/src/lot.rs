use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use vaxtrack_core::{DomainError, LotId};

/// One tracked vaccine lot: a specific manufactured batch of a product,
/// identified by vaccine + lot number, counted in doses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccineLot {
    pub id: LotId,
    pub vaccine: String,
    pub lot_number: String,
    pub quantity_on_hand: u32,
    pub expiration_date: NaiveDate,
    pub location: String,
    pub minimum_stock: u32,
    pub vaccine_family: String,
    pub last_updated: DateTime<Utc>,
    /// Bumped on every successful quantity write (optimistic concurrency).
    pub version: u64,
}

impl VaccineLot {
    /// Validate and build a fresh lot (version starts at 1).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: LotId,
        vaccine: impl Into<String>,
        lot_number: impl Into<String>,
        quantity_on_hand: u32,
        expiration_date: NaiveDate,
        location: impl Into<String>,
        minimum_stock: u32,
        vaccine_family: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let vaccine = vaccine.into();
        let lot_number = lot_number.into();
        if vaccine.trim().is_empty() {
            return Err(DomainError::validation("vaccine cannot be empty"));
        }
        if lot_number.trim().is_empty() {
            return Err(DomainError::validation("lot number cannot be empty"));
        }
        Ok(Self {
            id,
            vaccine,
            lot_number,
            quantity_on_hand,
            expiration_date,
            location: location.into(),
            minimum_stock,
            vaccine_family: vaccine_family.into(),
            last_updated: now,
            version: 1,
        })
    }

    /// Quantity at or below the reorder floor.
    pub fn is_low_stock(&self) -> bool {
        self.quantity_on_hand <= self.minimum_stock
    }

    /// Expires on or before `cutoff`.
    pub fn expires_by(&self, cutoff: NaiveDate) -> bool {
        self.expiration_date <= cutoff
    }

    pub fn snapshot(&self) -> LotSnapshot {
        LotSnapshot {
            id: self.id,
            vaccine: self.vaccine.clone(),
            lot_number: self.lot_number.clone(),
            system_count: self.quantity_on_hand,
            version: self.version,
        }
    }
}

/// Read-only view of one lot as it stood when a reconciliation session
/// started. `system_count` is the quantity per the system of record at
/// snapshot time; `version` is carried so the eventual corrective write can
/// detect interleaved updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotSnapshot {
    pub id: LotId,
    pub vaccine: String,
    pub lot_number: String,
    pub system_count: u32,
    pub version: u64,
}
