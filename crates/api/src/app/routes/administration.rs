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
use vaxtrack_inventory::{administration, AdministrationRecord};

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", post(administer_doses).get(list_administrations))
}

pub async fn administer_doses(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<crate::app::dto::AdministerDosesRequest>,
) -> axum::response::Response {
    let record = AdministrationRecord {
        id: RecordId::new(),
        lot_id: body.lot_id,
        administered_date: body.administered_date,
        doses_used: body.doses_used,
        patient_age_group: body.patient_age_group,
        administered_by: body.administered_by,
        location: body.location,
    };

    let remaining =
        match administration::administer_doses(services.store.as_ref(), &record, Utc::now()).await
        {
            Ok(remaining) => remaining,
            Err(e) => return errors::inventory_error_response(e),
        };

    services.administrations.lock().unwrap().push(record.clone());

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "record": record,
            "remaining": remaining,
        })),
    )
        .into_response()
}

pub async fn list_administrations(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let records = services.administrations.lock().unwrap().clone();
    (
        StatusCode::OK,
        Json(serde_json::json!({ "records": records })),
    )
        .into_response()
}
