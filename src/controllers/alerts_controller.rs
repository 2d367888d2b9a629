use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::{models::AlertInput, AlertError, AppState};

const DEFAULT_HISTORY_LIMIT: i64 = 50;

pub fn error_response(e: AlertError) -> Response {
    let status = match &e {
        AlertError::Validation(_) | AlertError::Config(_) => StatusCode::BAD_REQUEST,
        AlertError::NotFound(_) => StatusCode::NOT_FOUND,
        AlertError::DataUnavailable(_) => StatusCode::BAD_GATEWAY,
        AlertError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

fn bad_id() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad id" }))).into_response()
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct InstantiateRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub params: HashMap<String, f64>,
}

// GET /alerts
pub async fn get_alerts(State(state): State<AppState>) -> Response {
    match state.service.list_alerts().await {
        Ok(alerts) => (StatusCode::OK, Json(alerts)).into_response(),
        Err(e) => error_response(e),
    }
}

// POST /alerts
pub async fn post_create_alert(
    State(state): State<AppState>,
    Json(input): Json<AlertInput>,
) -> Response {
    match state.service.create_alert(input).await {
        Ok(alert) => (StatusCode::CREATED, Json(alert)).into_response(),
        Err(e) => error_response(e),
    }
}

// GET /alerts/:id
pub async fn get_alert(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(oid) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    match state.service.get_alert(oid).await {
        Ok(alert) => (StatusCode::OK, Json(alert)).into_response(),
        Err(e) => error_response(e),
    }
}

// PUT /alerts/:id
pub async fn put_update_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<AlertInput>,
) -> Response {
    let Ok(oid) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    match state.service.update_alert(oid, input).await {
        Ok(alert) => (StatusCode::OK, Json(alert)).into_response(),
        Err(e) => error_response(e),
    }
}

// DELETE /alerts/:id
pub async fn delete_alert(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(oid) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    match state.service.delete_alert(oid).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

// POST /alerts/:id/toggle
pub async fn post_toggle_alert(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(oid) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    match state.service.toggle_status(oid).await {
        Ok(alert) => (StatusCode::OK, Json(alert)).into_response(),
        Err(e) => error_response(e),
    }
}

// GET /alerts/:id/history
pub async fn get_alert_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> Response {
    let Ok(oid) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match state.service.list_history(Some(oid), limit).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => error_response(e),
    }
}

// GET /history
pub async fn get_history(State(state): State<AppState>, Query(q): Query<HistoryQuery>) -> Response {
    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match state.service.list_history(None, limit).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => error_response(e),
    }
}

// GET /templates
pub async fn get_templates(State(state): State<AppState>) -> Response {
    match state.service.list_templates().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => error_response(e),
    }
}

// POST /templates/:id/instantiate
pub async fn post_instantiate_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
    Json(req): Json<InstantiateRequest>,
) -> Response {
    match state
        .service
        .instantiate_from_template(&template_id, &req.code, &req.name, &req.params)
        .await
    {
        Ok(alert) => (StatusCode::CREATED, Json(alert)).into_response(),
        Err(e) => error_response(e),
    }
}
