//! Vaccine lot inventory: the lot model, the store collaborator contract, and
//! the simple stock-mutating workflows (receiving, administration, loss).
//!
//! Every quantity write in the system funnels through
//! [`InventoryStore::update_quantity`] with an optimistic version guard, so
//! two workflows touching the same lot cannot silently lose each other's
//! updates.

pub mod administration;
pub mod error;
pub mod loss;
pub mod lot;
pub mod memory;
pub mod receiving;
pub mod reports;
pub mod store;

pub use administration::AdministrationRecord;
pub use error::InventoryError;
pub use loss::{LossRecord, WastageClass};
pub use lot::{LotSnapshot, VaccineLot};
pub use memory::InMemoryInventoryStore;
pub use receiving::VaccineReceipt;
pub use store::{InventoryStore, StoreError};
