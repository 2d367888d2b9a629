use axum::{Router, routing::{get, post, put}};
use crate::{AppState, controllers::monitor_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/monitor/status", get(monitor_controller::get_status))
        .route("/monitor/start", post(monitor_controller::post_start))
        .route("/monitor/stop", post(monitor_controller::post_stop))
        .route("/monitor/interval", put(monitor_controller::put_interval))
        .route("/stocks/:code/check", post(monitor_controller::post_check_stock))
}
