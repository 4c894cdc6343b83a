use std::sync::{Arc, Mutex};

use vaxtrack_inventory::{
    AdministrationRecord, InMemoryInventoryStore, InventoryStore, LossRecord, VaccineReceipt,
};
use vaxtrack_reconciliation::ReconciliationEngine;

/// Shared application state.
///
/// The reconciliation session sits behind a `tokio::sync::Mutex` because it
/// is held across store awaits during commit; there is exactly one logical
/// session at a time (single operator), so contention is not a concern.
pub struct AppServices {
    pub store: Arc<dyn InventoryStore>,
    pub session: tokio::sync::Mutex<Option<ReconciliationEngine>>,
    pub receipts: Mutex<Vec<VaccineReceipt>>,
    pub administrations: Mutex<Vec<AdministrationRecord>>,
    pub losses: Mutex<Vec<LossRecord>>,
}

pub fn build_services() -> AppServices {
    AppServices {
        store: Arc::new(InMemoryInventoryStore::new()),
        session: tokio::sync::Mutex::new(None),
        receipts: Mutex::new(Vec::new()),
        administrations: Mutex::new(Vec::new()),
        losses: Mutex::new(Vec::new()),
    }
}
