//! Read-side stock queries for the dashboard.

use chrono::{Days, NaiveDate};

use crate::error::InventoryError;
use crate::lot::VaccineLot;
use crate::store::InventoryStore;

/// Lots at or below their reorder floor.
pub async fn low_stock(store: &dyn InventoryStore) -> Result<Vec<VaccineLot>, InventoryError> {
    let mut lots = all_lots(store).await?;
    lots.retain(VaccineLot::is_low_stock);
    Ok(lots)
}

/// Lots expiring within `days` of `today` (inclusive).
pub async fn expiring_within(
    store: &dyn InventoryStore,
    today: NaiveDate,
    days: u64,
) -> Result<Vec<VaccineLot>, InventoryError> {
    let cutoff = today
        .checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX);
    let mut lots = all_lots(store).await?;
    lots.retain(|lot| lot.expires_by(cutoff));
    Ok(lots)
}

/// Total doses on hand across all lots.
pub async fn total_doses(store: &dyn InventoryStore) -> Result<u64, InventoryError> {
    let lots = all_lots(store).await?;
    Ok(lots.iter().map(|l| u64::from(l.quantity_on_hand)).sum())
}

async fn all_lots(store: &dyn InventoryStore) -> Result<Vec<VaccineLot>, InventoryError> {
    let snapshots = store.list_all().await?;
    let mut lots = Vec::with_capacity(snapshots.len());
    for snap in snapshots {
        lots.push(store.get(snap.id).await?);
    }
    Ok(lots)
}
