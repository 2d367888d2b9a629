use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use crate::models::{builtin_templates, Alert, AlertTemplate, TriggerHistory};

use super::repository::AlertRepository;

#[derive(Default)]
struct Store {
    alerts: HashMap<ObjectId, Alert>,
    history: Vec<TriggerHistory>,
    templates: HashMap<String, AlertTemplate>,
}

/// Process-local repository. Used for tests and `ALERT_STORAGE=memory`.
#[derive(Default)]
pub struct MemoryAlertRepository {
    store: RwLock<Store>,
}

impl MemoryAlertRepository {
    /// Repository preloaded with the built-in templates.
    pub fn with_builtin_templates() -> Self {
        let templates = builtin_templates()
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();

        Self {
            store: RwLock::new(Store {
                templates,
                ..Default::default()
            }),
        }
    }
}

fn newest_first(mut items: Vec<Alert>) -> Vec<Alert> {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    items
}

#[async_trait]
impl AlertRepository for MemoryAlertRepository {
    async fn insert_alert(&self, alert: &Alert) -> Result<(), String> {
        let mut store = self.store.write().await;
        if store.alerts.contains_key(&alert.id) {
            return Err(format!("duplicate alert id {}", alert.id.to_hex()));
        }
        store.alerts.insert(alert.id, alert.clone());
        Ok(())
    }

    async fn update_alert(&self, alert: &Alert) -> Result<bool, String> {
        let mut store = self.store.write().await;
        match store.alerts.get_mut(&alert.id) {
            Some(slot) => {
                *slot = alert.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_alert(&self, id: ObjectId) -> Result<bool, String> {
        Ok(self.store.write().await.alerts.remove(&id).is_some())
    }

    async fn find_alert(&self, id: ObjectId) -> Result<Option<Alert>, String> {
        Ok(self.store.read().await.alerts.get(&id).cloned())
    }

    async fn list_alerts(&self) -> Result<Vec<Alert>, String> {
        let store = self.store.read().await;
        Ok(newest_first(store.alerts.values().cloned().collect()))
    }

    async fn list_active_alerts(&self) -> Result<Vec<Alert>, String> {
        let store = self.store.read().await;
        Ok(newest_first(
            store.alerts.values().filter(|a| a.is_active).cloned().collect(),
        ))
    }

    async fn list_active_alerts_for_code(&self, code: &str) -> Result<Vec<Alert>, String> {
        let store = self.store.read().await;
        Ok(newest_first(
            store
                .alerts
                .values()
                .filter(|a| a.is_active && a.code == code)
                .cloned()
                .collect(),
        ))
    }

    async fn append_history(&self, entry: &TriggerHistory) -> Result<(), String> {
        self.store.write().await.history.push(entry.clone());
        Ok(())
    }

    async fn list_history(
        &self,
        alert_id: Option<ObjectId>,
        limit: i64,
    ) -> Result<Vec<TriggerHistory>, String> {
        let store = self.store.read().await;
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);

        Ok(store
            .history
            .iter()
            .rev()
            .filter(|h| alert_id.is_none_or(|id| h.alert_id == id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_template(&self, id: &str) -> Result<Option<AlertTemplate>, String> {
        Ok(self.store.read().await.templates.get(id).cloned())
    }

    async fn list_templates(&self) -> Result<Vec<AlertTemplate>, String> {
        let store = self.store.read().await;
        let mut items: Vec<AlertTemplate> = store.templates.values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    async fn is_in_cooldown(&self, id: ObjectId, now: i64) -> Result<bool, String> {
        let store = self.store.read().await;
        store
            .alerts
            .get(&id)
            .map(|alert| alert.in_cooldown(now))
            .ok_or_else(|| format!("alert {} not found", id.to_hex()))
    }

    async fn update_last_triggered_time(&self, id: ObjectId, at: i64) -> Result<(), String> {
        let mut store = self.store.write().await;
        let alert = store
            .alerts
            .get_mut(&id)
            .ok_or_else(|| format!("alert {} not found", id.to_hex()))?;
        alert.last_triggered_at = Some(at);
        alert.updated_at = at;
        Ok(())
    }

    async fn toggle_status(&self, id: ObjectId, active: bool, now: i64) -> Result<bool, String> {
        let mut store = self.store.write().await;
        match store.alerts.get_mut(&id) {
            Some(alert) => {
                alert.is_active = active;
                alert.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
