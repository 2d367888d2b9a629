use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerHistory {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub alert_id: ObjectId,
    pub code: String,
    pub name: String,
    pub alert_type: String,

    pub trigger_price: f64,
    pub message: String,
    pub triggered_at: i64,
}
