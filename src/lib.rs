//! Library entrypoint for market-alerts.
//!
//! Threshold alerts over live market snapshots: the condition model, the
//! rule evaluator, the alert lifecycle service and the polling monitor. The
//! HTTP layer is a thin shell over those, kept here so integration tests
//! under `tests/` can build the router directly.

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub mod services;

pub mod controllers;
pub mod routes;

use std::sync::Arc;

pub use error::{AlertError, AlertResult};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<services::alerts_service::AlertService>,
    pub monitor: services::alert_monitor::AlertMonitor,
    pub events_tx: events::EventSender,
}
