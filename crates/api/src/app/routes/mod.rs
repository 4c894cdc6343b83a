use axum::Router;

pub mod administration;
pub mod inventory;
pub mod losses;
pub mod receiving;
pub mod reconciliation;
pub mod reports;
pub mod system;

/// Router for all application endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/inventory", inventory::router())
        .nest("/receiving", receiving::router())
        .nest("/administration", administration::router())
        .nest("/losses", losses::router())
        .nest("/reports", reports::router())
        .nest("/reconciliation", reconciliation::router())
}
