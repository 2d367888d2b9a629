use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::models::{Alert, AlertTemplate, TriggerHistory};

/// Storage contract for alert definitions, trigger history and templates.
///
/// Implementations own their consistency guarantees; callers assume
/// at-least-once writes.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn insert_alert(&self, alert: &Alert) -> Result<(), String>;

    /// Returns false when no alert with that id exists.
    async fn update_alert(&self, alert: &Alert) -> Result<bool, String>;

    async fn delete_alert(&self, id: ObjectId) -> Result<bool, String>;

    async fn find_alert(&self, id: ObjectId) -> Result<Option<Alert>, String>;

    async fn list_alerts(&self) -> Result<Vec<Alert>, String>;

    async fn list_active_alerts(&self) -> Result<Vec<Alert>, String>;

    async fn list_active_alerts_for_code(&self, code: &str) -> Result<Vec<Alert>, String>;

    async fn append_history(&self, entry: &TriggerHistory) -> Result<(), String>;

    /// Newest first. `alert_id = None` lists across all alerts.
    async fn list_history(
        &self,
        alert_id: Option<ObjectId>,
        limit: i64,
    ) -> Result<Vec<TriggerHistory>, String>;

    async fn find_template(&self, id: &str) -> Result<Option<AlertTemplate>, String>;

    async fn list_templates(&self) -> Result<Vec<AlertTemplate>, String>;

    /// Judged against the stored alert's own cooldown window.
    async fn is_in_cooldown(&self, id: ObjectId, now: i64) -> Result<bool, String>;

    async fn update_last_triggered_time(&self, id: ObjectId, at: i64) -> Result<(), String>;

    async fn toggle_status(&self, id: ObjectId, active: bool, now: i64) -> Result<bool, String>;
}
