use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::alerts_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/alerts",
            get(alerts_controller::get_alerts).post(alerts_controller::post_create_alert),
        )
        .route(
            "/alerts/:id",
            get(alerts_controller::get_alert)
                .put(alerts_controller::put_update_alert)
                .delete(alerts_controller::delete_alert),
        )
        .route("/alerts/:id/toggle", post(alerts_controller::post_toggle_alert))
        .route("/alerts/:id/history", get(alerts_controller::get_alert_history))
        .route("/history", get(alerts_controller::get_history))
        .route("/templates", get(alerts_controller::get_templates))
        .route(
            "/templates/:id/instantiate",
            post(alerts_controller::post_instantiate_template),
        )
}
