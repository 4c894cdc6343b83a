use thiserror::Error;

use vaxtrack_core::DomainError;

use crate::store::StoreError;

/// Failure of a stock-mutating workflow (receiving, administration, loss):
/// either the record itself was invalid, or the store write failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
