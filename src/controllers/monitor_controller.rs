use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::AppState;

use super::alerts_controller::error_response;

#[derive(Deserialize)]
pub struct IntervalForm {
    pub secs: u64,
}

// GET /monitor/status
pub async fn get_status(State(state): State<AppState>) -> Response {
    (StatusCode::OK, Json(state.monitor.status().await)).into_response()
}

// POST /monitor/start
pub async fn post_start(State(state): State<AppState>) -> Response {
    let started = state.monitor.start().await;
    (StatusCode::OK, Json(json!({ "started": started }))).into_response()
}

// POST /monitor/stop
pub async fn post_stop(State(state): State<AppState>) -> Response {
    let stopped = state.monitor.stop().await;
    (StatusCode::OK, Json(json!({ "stopped": stopped }))).into_response()
}

// PUT /monitor/interval
pub async fn put_interval(State(state): State<AppState>, Json(form): Json<IntervalForm>) -> Response {
    match state
        .monitor
        .set_check_interval(Duration::from_secs(form.secs))
        .await
    {
        Ok(()) => (StatusCode::OK, Json(state.monitor.status().await)).into_response(),
        Err(e) => error_response(e),
    }
}

// POST /stocks/:code/check
pub async fn post_check_stock(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    match state.monitor.check_stock_alerts(&code).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => error_response(e),
    }
}
