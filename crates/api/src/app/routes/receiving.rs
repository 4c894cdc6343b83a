use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use vaxtrack_core::ReceiptId;
use vaxtrack_inventory::{receiving, VaccineReceipt};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", post(receive_shipment).get(list_receipts))
}

pub async fn receive_shipment(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ReceiveShipmentRequest>,
) -> axum::response::Response {
    let receipt = VaccineReceipt {
        id: ReceiptId::new(),
        received_date: body.received_date,
        vaccine: body.vaccine,
        lot_number: body.lot_number,
        quantity_sent: body.quantity_sent,
        quantity_received: body.quantity_received,
        doses_passed: body.doses_passed,
        doses_failed: body.doses_failed,
        supplier: body.supplier,
        shipment_id: body.shipment_id,
        received_by: body.received_by,
        storage_temperature: body.storage_temperature,
        expiration_date: body.expiration_date,
        location: body.location,
        minimum_stock: body.minimum_stock,
        vaccine_family: body.vaccine_family,
    };

    let lot = match receiving::accept_receipt(services.store.as_ref(), &receipt, Utc::now()).await {
        Ok(lot) => lot,
        Err(e) => return errors::inventory_error_response(e),
    };

    services.receipts.lock().unwrap().push(receipt.clone());

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "receipt": receipt,
            "lot": dto::lot_json(&lot),
        })),
    )
        .into_response()
}

pub async fn list_receipts(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let receipts = services.receipts.lock().unwrap().clone();
    (
        StatusCode::OK,
        Json(serde_json::json!({ "receipts": receipts })),
    )
        .into_response()
}
