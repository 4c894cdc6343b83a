use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use vaxtrack_core::DomainError;
use vaxtrack_inventory::{InventoryError, StoreError};
use vaxtrack_reconciliation::ReconciliationError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_error_response(err: DomainError) -> axum::response::Response {
    match &err {
        DomainError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string()),
        DomainError::InvariantViolation(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", err.to_string())
        }
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", err.to_string()),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
    }
}

pub fn store_error_response(err: StoreError) -> axum::response::Response {
    match &err {
        StoreError::Unavailable(_) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", err.to_string())
        }
        StoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        StoreError::Conflict { .. } => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
    }
}

pub fn inventory_error_response(err: InventoryError) -> axum::response::Response {
    match err {
        InventoryError::Domain(e) => domain_error_response(e),
        InventoryError::Store(e) => store_error_response(e),
    }
}

/// Map engine failures to HTTP, surfacing the full detail (violation lists,
/// partial-commit lot sets) verbatim rather than a generic message.
pub fn reconciliation_error_response(err: ReconciliationError) -> axum::response::Response {
    match err {
        ReconciliationError::InvalidInput(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_input", msg)
        }
        ReconciliationError::UnknownLot(lot_id) => json_error(
            StatusCode::NOT_FOUND,
            "unknown_lot",
            format!("lot {lot_id} is not part of this reconciliation session"),
        ),
        ReconciliationError::Phase { .. } => {
            json_error(StatusCode::CONFLICT, "wrong_phase", err.to_string())
        }
        ReconciliationError::Validation(violations) => {
            let detail: Vec<serde_json::Value> = violations
                .iter()
                .map(|v| {
                    let mut value = serde_json::to_value(v).unwrap_or_default();
                    if let Some(obj) = value.as_object_mut() {
                        obj.insert("message".to_string(), json!(v.to_string()));
                    }
                    value
                })
                .collect();
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                axum::Json(json!({
                    "error": "validation_error",
                    "message": ReconciliationError::Validation(violations).to_string(),
                    "violations": detail,
                })),
            )
                .into_response()
        }
        ReconciliationError::PartialCommit(partial) => (
            StatusCode::BAD_GATEWAY,
            axum::Json(json!({
                "error": "partial_commit",
                "message": format!("commit partially failed: {partial}"),
                "succeeded": partial.succeeded,
                "failed": partial
                    .failed
                    .iter()
                    .map(|f| json!({
                        "lot_id": f.lot_id,
                        "message": f.error.to_string(),
                    }))
                    .collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        ReconciliationError::Store(e) => store_error_response(e),
    }
}

pub fn no_session_response() -> axum::response::Response {
    json_error(
        StatusCode::NOT_FOUND,
        "no_session",
        "no reconciliation session has been started",
    )
}
