use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use vaxtrack_core::LotId;
use vaxtrack_reconciliation::ReconciliationEngine;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/session", post(start_session).get(get_session))
        .route("/session/month", put(set_month))
        .route("/session/begin-counting", post(begin_counting))
        .route("/session/begin-review", post(begin_review))
        .route("/session/back-to-counting", post(back_to_counting))
        .route("/session/entries/:lot_id/count", put(set_count))
        .route("/session/entries/:lot_id/reason", put(set_reason))
        .route("/session/validation", get(validation))
        .route("/session/commit", post(commit))
}

/// Start (or restart) the single logical session from current inventory.
pub async fn start_session(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let engine = match ReconciliationEngine::start(Arc::clone(&services.store)).await {
        Ok(engine) => engine,
        Err(e) => return errors::reconciliation_error_response(e),
    };

    let body = dto::session_json(engine.session());
    *services.session.lock().await = Some(engine);
    (StatusCode::CREATED, Json(body)).into_response()
}

pub async fn get_session(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let guard = services.session.lock().await;
    match guard.as_ref() {
        Some(engine) => {
            (StatusCode::OK, Json(dto::session_json(engine.session()))).into_response()
        }
        None => errors::no_session_response(),
    }
}

pub async fn set_month(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SetMonthRequest>,
) -> axum::response::Response {
    let mut guard = services.session.lock().await;
    let Some(engine) = guard.as_mut() else {
        return errors::no_session_response();
    };
    match engine.set_month(body.month) {
        Ok(()) => (StatusCode::OK, Json(dto::session_json(engine.session()))).into_response(),
        Err(e) => errors::reconciliation_error_response(e),
    }
}

pub async fn begin_counting(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let mut guard = services.session.lock().await;
    let Some(engine) = guard.as_mut() else {
        return errors::no_session_response();
    };
    match engine.begin_counting() {
        Ok(()) => (StatusCode::OK, Json(dto::session_json(engine.session()))).into_response(),
        Err(e) => errors::reconciliation_error_response(e),
    }
}

pub async fn begin_review(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let mut guard = services.session.lock().await;
    let Some(engine) = guard.as_mut() else {
        return errors::no_session_response();
    };
    match engine.begin_review() {
        Ok(()) => (StatusCode::OK, Json(dto::session_json(engine.session()))).into_response(),
        Err(e) => errors::reconciliation_error_response(e),
    }
}

pub async fn back_to_counting(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let mut guard = services.session.lock().await;
    let Some(engine) = guard.as_mut() else {
        return errors::no_session_response();
    };
    match engine.back_to_counting() {
        Ok(()) => (StatusCode::OK, Json(dto::session_json(engine.session()))).into_response(),
        Err(e) => errors::reconciliation_error_response(e),
    }
}

pub async fn set_count(
    Extension(services): Extension<Arc<AppServices>>,
    Path(lot_id): Path<String>,
    Json(body): Json<dto::SetCountRequest>,
) -> axum::response::Response {
    let lot_id: LotId = match lot_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid lot id"),
    };

    let mut guard = services.session.lock().await;
    let Some(engine) = guard.as_mut() else {
        return errors::no_session_response();
    };
    match engine.set_physical_count(lot_id, body.count) {
        Ok(()) => match engine.session().entry(lot_id) {
            Some(entry) => (StatusCode::OK, Json(dto::entry_json(entry))).into_response(),
            None => errors::no_session_response(),
        },
        Err(e) => errors::reconciliation_error_response(e),
    }
}

pub async fn set_reason(
    Extension(services): Extension<Arc<AppServices>>,
    Path(lot_id): Path<String>,
    Json(body): Json<dto::SetReasonRequest>,
) -> axum::response::Response {
    let lot_id: LotId = match lot_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid lot id"),
    };

    let mut guard = services.session.lock().await;
    let Some(engine) = guard.as_mut() else {
        return errors::no_session_response();
    };
    match engine.set_discrepancy_reason(lot_id, &body.reason) {
        Ok(()) => match engine.session().entry(lot_id) {
            Some(entry) => (StatusCode::OK, Json(dto::entry_json(entry))).into_response(),
            None => errors::no_session_response(),
        },
        Err(e) => errors::reconciliation_error_response(e),
    }
}

pub async fn validation(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let guard = services.session.lock().await;
    let Some(engine) = guard.as_ref() else {
        return errors::no_session_response();
    };
    let violations = engine.validate_for_commit();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "valid": violations.is_empty(),
            "violations": violations
                .iter()
                .map(|v| serde_json::json!({
                    "detail": v,
                    "message": v.to_string(),
                }))
                .collect::<Vec<_>>(),
        })),
    )
        .into_response()
}

pub async fn commit(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let mut guard = services.session.lock().await;
    let Some(engine) = guard.as_mut() else {
        return errors::no_session_response();
    };
    match engine.commit().await {
        Ok(result) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "updated_count": result.updated_count,
                "total_variance": result.total_variance,
                "session": dto::session_json(engine.session()),
            })),
        )
            .into_response(),
        Err(e) => errors::reconciliation_error_response(e),
    }
}
