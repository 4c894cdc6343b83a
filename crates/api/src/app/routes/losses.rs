use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use vaxtrack_core::RecordId;
use vaxtrack_inventory::{loss, LossRecord};

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", post(report_loss).get(list_losses))
}

pub async fn report_loss(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<crate::app::dto::ReportLossRequest>,
) -> axum::response::Response {
    let record = LossRecord {
        id: RecordId::new(),
        lot_id: body.lot_id,
        reported_date: body.reported_date,
        quantity: body.quantity,
        reason: body.reason,
        estimated_value: body.estimated_value,
        reported_by: body.reported_by,
        description: body.description,
        wastage_type: body.wastage_type,
    };

    let remaining = match loss::record_loss(services.store.as_ref(), &record, Utc::now()).await {
        Ok(remaining) => remaining,
        Err(e) => return errors::inventory_error_response(e),
    };

    services.losses.lock().unwrap().push(record.clone());

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "record": record,
            "remaining": remaining,
        })),
    )
        .into_response()
}

pub async fn list_losses(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let records = services.losses.lock().unwrap().clone();
    (
        StatusCode::OK,
        Json(serde_json::json!({ "records": records })),
    )
        .into_response()
}
