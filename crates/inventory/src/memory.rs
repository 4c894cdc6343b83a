use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use vaxtrack_core::LotId;

use crate::lot::{LotSnapshot, VaccineLot};
use crate::store::{InventoryStore, StoreError};

/// In-memory inventory store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    lots: RwLock<HashMap<LotId, VaccineLot>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with lots (test/dev helper); ignores version checks.
    pub fn seeded(lots: impl IntoIterator<Item = VaccineLot>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.lots.write().unwrap_or_else(|e| e.into_inner());
            for lot in lots {
                guard.insert(lot.id, lot);
            }
        }
        store
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn list_all(&self) -> Result<Vec<LotSnapshot>, StoreError> {
        let lots = self
            .lots
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        // Stable order so sessions derived from the same state look the same.
        let mut snapshots: Vec<LotSnapshot> = lots.values().map(VaccineLot::snapshot).collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(snapshots)
    }

    async fn get(&self, lot_id: LotId) -> Result<VaccineLot, StoreError> {
        let lots = self
            .lots
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        lots.get(&lot_id)
            .cloned()
            .ok_or(StoreError::NotFound(lot_id))
    }

    async fn insert(&self, lot: VaccineLot) -> Result<(), StoreError> {
        let mut lots = self
            .lots
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        lots.insert(lot.id, lot);
        Ok(())
    }

    async fn update_quantity(
        &self,
        lot_id: LotId,
        new_quantity: u32,
        expected_version: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut lots = self
            .lots
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let lot = lots.get_mut(&lot_id).ok_or(StoreError::NotFound(lot_id))?;

        if lot.version != expected_version {
            return Err(StoreError::Conflict {
                lot_id,
                expected: expected_version,
                found: lot.version,
            });
        }

        lot.quantity_on_hand = new_quantity;
        lot.last_updated = updated_at;
        lot.version += 1;
        Ok(())
    }
}
