mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{harness, quote_with_change, Harness, SURGE_5};
use market_alerts::{routes, AppState};

fn app(h: &Harness) -> Router {
    let state = AppState {
        service: h.service.clone(),
        monitor: h.monitor.clone(),
        events_tx: h.service.events().clone(),
    };
    routes::app(state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn response_json(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

fn surge_body(code: &str) -> Value {
    json!({
        "code": code,
        "name": "Apple",
        "alert_type": "price_change",
        "conditions": SURGE_5,
        "sensitivity": 0.001,
        "cooldown_hours": 1
    })
}

#[tokio::test]
async fn health_returns_ok() {
    let h = harness();
    let res = app(&h).oneshot(empty_request("GET", "/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_path_returns_json_404() {
    let h = harness();
    let res = app(&h).oneshot(empty_request("GET", "/nope")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(response_json(res).await["error"], "not found");
}

#[tokio::test]
async fn post_alert_creates_and_lists() {
    let h = harness();
    let app = app(&h);

    let res = app
        .clone()
        .oneshot(json_request("POST", "/alerts", surge_body("aapl")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let created = response_json(res).await;
    assert_eq!(created["code"], "AAPL");
    assert_eq!(created["is_active"], true);
    assert_eq!(created["post_trigger_action"], "continue");

    let res = app.oneshot(empty_request("GET", "/alerts")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(response_json(res).await.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn post_invalid_alert_returns_400() {
    let h = harness();
    let mut body = surge_body("AAPL");
    body["sensitivity"] = json!(0.5);

    let res = app(&h).oneshot(json_request("POST", "/alerts", body)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(response_json(res).await["error"]
        .as_str()
        .unwrap_or_default()
        .contains("sensitivity"));
}

#[tokio::test]
async fn alert_by_id_handles_bad_and_unknown_ids() {
    let h = harness();
    let app = app(&h);

    let res = app
        .clone()
        .oneshot(empty_request("GET", "/alerts/not-an-id"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(empty_request("GET", "/alerts/65a000000000000000000000"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn toggle_and_delete_by_id() {
    let h = harness();
    let alert = h.service.create_alert(common::input("MSFT", SURGE_5)).await.unwrap();
    let id = alert.id.to_hex();
    let app = app(&h);

    let res = app
        .clone()
        .oneshot(empty_request("POST", &format!("/alerts/{id}/toggle")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(response_json(res).await["is_active"], false);

    let res = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/alerts/{id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app
        .oneshot(empty_request("DELETE", &format!("/alerts/{id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn templates_list_and_instantiate() {
    let h = harness();
    let app = app(&h);

    let res = app.clone().oneshot(empty_request("GET", "/templates")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let templates = response_json(res).await;
    let ids: Vec<&str> = templates
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["_id"].as_str())
        .collect();
    assert!(ids.contains(&"price_surge"));
    assert!(ids.contains(&"ma_golden_cross"));

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/templates/price_surge/instantiate",
            json!({ "code": "TSLA", "name": "Tesla", "params": { "value": 8 } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let alert = response_json(res).await;
    assert_eq!(alert["code"], "TSLA");
    assert_eq!(alert["conditions"]["conditions"][0]["value"], 8.0);

    let res = app
        .oneshot(json_request(
            "POST",
            "/templates/moon_shot/instantiate",
            json!({ "code": "TSLA", "name": "Tesla" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn check_stock_reports_fired_alerts_and_history() {
    let h = harness();
    h.service.create_alert(common::input("AAPL", SURGE_5)).await.unwrap();
    h.quotes.set("AAPL", quote_with_change(190.0, 7.0)).await;
    let app = app(&h);

    let res = app
        .clone()
        .oneshot(empty_request("POST", "/stocks/AAPL/check"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let report = response_json(res).await;
    assert_eq!(report["fired"], 1);
    assert_eq!(report["evaluated"], 1);

    let res = app.oneshot(empty_request("GET", "/history?limit=5")).await.unwrap();
    let history = response_json(res).await;
    assert_eq!(history.as_array().map(Vec::len), Some(1));
    assert_eq!(history[0]["code"], "AAPL");
}

#[tokio::test]
async fn check_stock_without_data_returns_502() {
    let h = harness();
    h.service.create_alert(common::input("AAPL", SURGE_5)).await.unwrap();

    let res = app(&h)
        .oneshot(empty_request("POST", "/stocks/AAPL/check"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn monitor_status_and_interval() {
    let h = harness();
    let app = app(&h);

    let res = app
        .clone()
        .oneshot(empty_request("GET", "/monitor/status"))
        .await
        .unwrap();
    let status = response_json(res).await;
    assert_eq!(status["running"], false);
    assert_eq!(status["check_interval_secs"], 10);

    let res = app
        .clone()
        .oneshot(json_request("PUT", "/monitor/interval", json!({ "secs": 0 })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(json_request("PUT", "/monitor/interval", json!({ "secs": 30 })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(response_json(res).await["check_interval_secs"], 30);

    let res = app
        .clone()
        .oneshot(empty_request("POST", "/monitor/start"))
        .await
        .unwrap();
    assert_eq!(response_json(res).await["started"], true);

    let res = app.oneshot(empty_request("POST", "/monitor/stop")).await.unwrap();
    assert_eq!(response_json(res).await["stopped"], true);
}
