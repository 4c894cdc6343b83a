use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use vaxtrack_inventory::reports;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/dashboard", get(dashboard))
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Horizon for the expiring-soon rollup, in days.
    #[serde(default = "default_expiry_days")]
    pub expiry_days: u64,
}

fn default_expiry_days() -> u64 {
    30
}

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<DashboardQuery>,
) -> axum::response::Response {
    let store = services.store.as_ref();
    let today = Utc::now().date_naive();

    let total_doses = match reports::total_doses(store).await {
        Ok(total) => total,
        Err(e) => return errors::inventory_error_response(e),
    };
    let low_stock = match reports::low_stock(store).await {
        Ok(lots) => lots,
        Err(e) => return errors::inventory_error_response(e),
    };
    let expiring = match reports::expiring_within(store, today, query.expiry_days).await {
        Ok(lots) => lots,
        Err(e) => return errors::inventory_error_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "total_doses": total_doses,
            "low_stock": low_stock.iter().map(dto::lot_json).collect::<Vec<_>>(),
            "expiring_soon": expiring.iter().map(dto::lot_json).collect::<Vec<_>>(),
        })),
    )
        .into_response()
}
