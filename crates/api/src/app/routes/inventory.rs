use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use vaxtrack_core::LotId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/lots", get(list_lots))
        .route("/lots/:id", get(get_lot))
}

pub async fn list_lots(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let snapshots = match services.store.list_all().await {
        Ok(s) => s,
        Err(e) => return errors::store_error_response(e),
    };

    let mut lots = Vec::with_capacity(snapshots.len());
    for snapshot in snapshots {
        match services.store.get(snapshot.id).await {
            Ok(lot) => lots.push(dto::lot_json(&lot)),
            Err(e) => return errors::store_error_response(e),
        }
    }

    (StatusCode::OK, Json(serde_json::json!({ "lots": lots }))).into_response()
}

pub async fn get_lot(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let lot_id: LotId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid lot id"),
    };

    match services.store.get(lot_id).await {
        Ok(lot) => (StatusCode::OK, Json(dto::lot_json(&lot))).into_response(),
        Err(e) => errors::store_error_response(e),
    }
}
