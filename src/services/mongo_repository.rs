use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::{FindOptions, ReplaceOptions},
    Collection, Cursor, Database, IndexModel,
};
use serde::de::DeserializeOwned;

use crate::models::{builtin_templates, Alert, AlertTemplate, TriggerHistory};

use super::repository::AlertRepository;

const ALERTS: &str = "alerts";
const HISTORY: &str = "alert_history";
const TEMPLATES: &str = "alert_templates";

#[derive(Clone)]
pub struct MongoAlertRepository {
    db: Database,
}

impl MongoAlertRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn alerts(&self) -> Collection<Alert> {
        self.db.collection::<Alert>(ALERTS)
    }

    fn history(&self) -> Collection<TriggerHistory> {
        self.db.collection::<TriggerHistory>(HISTORY)
    }

    fn templates(&self) -> Collection<AlertTemplate> {
        self.db.collection::<AlertTemplate>(TEMPLATES)
    }

    async fn find_alerts(&self, filter: Document) -> Result<Vec<Alert>, String> {
        let find_opts = FindOptions::builder().sort(doc! { "created_at": -1 }).build();

        let cursor = self
            .alerts()
            .find(filter, find_opts)
            .await
            .map_err(|e| e.to_string())?;

        collect(cursor).await
    }
}

async fn collect<T>(mut cursor: Cursor<T>) -> Result<Vec<T>, String>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let mut items = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res.map_err(|e| e.to_string())?);
    }
    Ok(items)
}

pub async fn ensure_indexes(db: &Database) -> Result<(), String> {
    // alerts: monitor scan (is_active + code)
    {
        let col = db.collection::<Document>(ALERTS);
        let model = IndexModel::builder()
            .keys(doc! { "is_active": 1, "code": 1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // history: per-alert listing, newest first
    {
        let col = db.collection::<Document>(HISTORY);
        let model = IndexModel::builder()
            .keys(doc! { "alert_id": 1, "triggered_at": -1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    Ok(())
}

/// Upserts the built-in templates so a fresh database can instantiate them.
pub async fn seed_templates(db: &Database) -> Result<usize, String> {
    let col = db.collection::<AlertTemplate>(TEMPLATES);
    let mut n = 0;

    for t in builtin_templates() {
        col.replace_one(
            doc! { "_id": &t.id },
            &t,
            ReplaceOptions::builder().upsert(true).build(),
        )
        .await
        .map_err(|e| e.to_string())?;
        n += 1;
    }

    Ok(n)
}

#[async_trait]
impl AlertRepository for MongoAlertRepository {
    async fn insert_alert(&self, alert: &Alert) -> Result<(), String> {
        self.alerts()
            .insert_one(alert, None)
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn update_alert(&self, alert: &Alert) -> Result<bool, String> {
        let res = self
            .alerts()
            .replace_one(doc! { "_id": alert.id }, alert, None)
            .await
            .map_err(|e| e.to_string())?;
        Ok(res.matched_count > 0)
    }

    async fn delete_alert(&self, id: ObjectId) -> Result<bool, String> {
        let res = self
            .alerts()
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| e.to_string())?;
        Ok(res.deleted_count > 0)
    }

    async fn find_alert(&self, id: ObjectId) -> Result<Option<Alert>, String> {
        self.alerts()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| e.to_string())
    }

    async fn list_alerts(&self) -> Result<Vec<Alert>, String> {
        self.find_alerts(doc! {}).await
    }

    async fn list_active_alerts(&self) -> Result<Vec<Alert>, String> {
        self.find_alerts(doc! { "is_active": true }).await
    }

    async fn list_active_alerts_for_code(&self, code: &str) -> Result<Vec<Alert>, String> {
        self.find_alerts(doc! { "is_active": true, "code": code }).await
    }

    async fn append_history(&self, entry: &TriggerHistory) -> Result<(), String> {
        self.history()
            .insert_one(entry, None)
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn list_history(
        &self,
        alert_id: Option<ObjectId>,
        limit: i64,
    ) -> Result<Vec<TriggerHistory>, String> {
        let filter = match alert_id {
            Some(id) => doc! { "alert_id": id },
            None => doc! {},
        };
        let find_opts = FindOptions::builder()
            .sort(doc! { "triggered_at": -1 })
            .limit(limit)
            .build();

        let cursor = self
            .history()
            .find(filter, find_opts)
            .await
            .map_err(|e| e.to_string())?;

        collect(cursor).await
    }

    async fn find_template(&self, id: &str) -> Result<Option<AlertTemplate>, String> {
        self.templates()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| e.to_string())
    }

    async fn list_templates(&self) -> Result<Vec<AlertTemplate>, String> {
        let find_opts = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let cursor = self
            .templates()
            .find(doc! {}, find_opts)
            .await
            .map_err(|e| e.to_string())?;

        collect(cursor).await
    }

    async fn is_in_cooldown(&self, id: ObjectId, now: i64) -> Result<bool, String> {
        let alert = self
            .find_alert(id)
            .await?
            .ok_or_else(|| format!("alert {} not found", id.to_hex()))?;

        Ok(alert.in_cooldown(now))
    }

    async fn update_last_triggered_time(&self, id: ObjectId, at: i64) -> Result<(), String> {
        self.alerts()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "last_triggered_at": at, "updated_at": at } },
                None,
            )
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn toggle_status(&self, id: ObjectId, active: bool, now: i64) -> Result<bool, String> {
        let res = self
            .alerts()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "is_active": active, "updated_at": now } },
                None,
            )
            .await
            .map_err(|e| e.to_string())?;
        Ok(res.matched_count > 0)
    }
}
