use serde::Serialize;

/// Payload delivered to the notification callback and to broadcast observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertNotification {
    pub alert_id: String,
    pub code: String,
    pub name: String,
    pub alert_type: String,

    pub trigger_price: f64,
    pub change_percent: f64,
    pub message: String,
    pub triggered_at: i64,

    pub enable_sound: bool,
    pub enable_desktop: bool,
}

/// Everything pushed on the broadcast channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum AlertEvent {
    AlertTriggered(AlertNotification),
    AlertsUpdated,
}

impl AlertEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            AlertEvent::AlertTriggered(_) => "alertTriggered",
            AlertEvent::AlertsUpdated => "alertsUpdated",
        }
    }
}

pub type EventSender = tokio::sync::broadcast::Sender<AlertEvent>;

pub fn channel(capacity: usize) -> (EventSender, tokio::sync::broadcast::Receiver<AlertEvent>) {
    tokio::sync::broadcast::channel(capacity.max(1))
}
