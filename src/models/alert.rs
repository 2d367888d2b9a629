use std::{fmt, str::FromStr};

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::ConditionGroup;

pub const SECS_PER_HOUR: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostTriggerAction {
    #[default]
    Continue,
    Disable,
    // same effect as Disable
    Once,
}

impl PostTriggerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostTriggerAction::Continue => "continue",
            PostTriggerAction::Disable => "disable",
            PostTriggerAction::Once => "once",
        }
    }

    pub fn disables_alert(&self) -> bool {
        matches!(self, PostTriggerAction::Disable | PostTriggerAction::Once)
    }
}

impl FromStr for PostTriggerAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(PostTriggerAction::Continue),
            "disable" => Ok(PostTriggerAction::Disable),
            "once" => Ok(PostTriggerAction::Once),
            other => Err(format!("unknown post-trigger action '{other}'")),
        }
    }
}

impl fmt::Display for PostTriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub code: String,
    pub name: String,
    pub alert_type: String,
    pub conditions: ConditionGroup,

    pub is_active: bool,
    pub sensitivity: f64,
    pub cooldown_hours: i32,
    pub post_trigger_action: PostTriggerAction,

    pub enable_sound: bool,
    pub enable_desktop: bool,

    pub last_triggered_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Where an alert sits in its lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Armed,
    Cooling,
    Disabled,
}

impl Alert {
    /// True while `now` is still inside the cooldown window of the last fire.
    pub fn in_cooldown(&self, now: i64) -> bool {
        match self.last_triggered_at {
            Some(at) => now - at < i64::from(self.cooldown_hours) * SECS_PER_HOUR,
            None => false,
        }
    }

    pub fn state(&self, now: i64) -> AlertState {
        if !self.is_active {
            AlertState::Disabled
        } else if self.in_cooldown(now) {
            AlertState::Cooling
        } else {
            AlertState::Armed
        }
    }
}

/// Caller-supplied alert definition, validated before it is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertInput {
    pub code: String,
    pub name: String,
    pub alert_type: String,
    // raw JSON, parsed into a ConditionGroup on validation
    pub conditions: String,
    #[serde(default)]
    pub sensitivity: f64,
    #[serde(default)]
    pub cooldown_hours: i32,
    #[serde(default = "default_post_trigger_action")]
    pub post_trigger_action: String,
    #[serde(default = "default_true")]
    pub enable_sound: bool,
    #[serde(default = "default_true")]
    pub enable_desktop: bool,
}

fn default_post_trigger_action() -> String {
    PostTriggerAction::Continue.as_str().to_string()
}

fn default_true() -> bool {
    true
}
