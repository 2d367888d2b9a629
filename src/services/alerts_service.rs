//! Alert lifecycle: validation, CRUD, the cooldown gate, and the fire
//! sequence. This is the only place that writes `is_active` and
//! `last_triggered_at`.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use crate::{
    error::{AlertError, AlertResult},
    events::{AlertEvent, AlertNotification, EventSender},
    models::{
        Alert, AlertInput, AlertState, AlertTemplate, ConditionGroup, MarketSnapshot,
        PostTriggerAction, TriggerHistory,
    },
};

use super::{
    evaluator::{self, Verdict},
    repository::AlertRepository,
};

/// Unix-seconds clock. Swappable so cooldown windows can be tested.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub const MAX_SENSITIVITY: f64 = 0.1;
pub const MAX_COOLDOWN_HOURS: i32 = 24;

pub const TEMPLATE_SENSITIVITY: f64 = 0.001;
pub const TEMPLATE_COOLDOWN_HOURS: i32 = 1;

/// Params key that overrides every condition value of a template.
pub const GENERIC_VALUE_KEY: &str = "value";

pub fn system_clock() -> Clock {
    Arc::new(|| Utc::now().timestamp())
}

/// Parsed pieces of an [`AlertInput`] that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedInput {
    pub code: String,
    pub name: String,
    pub alert_type: String,
    pub conditions: ConditionGroup,
    pub post_trigger_action: PostTriggerAction,
}

pub fn validate(input: &AlertInput) -> AlertResult<ValidatedInput> {
    let code = input.code.trim().to_uppercase();
    let name = input.name.trim().to_string();
    let alert_type = input.alert_type.trim().to_string();

    if code.is_empty() {
        return Err(AlertError::Validation("code must not be empty".into()));
    }
    if name.is_empty() {
        return Err(AlertError::Validation("name must not be empty".into()));
    }
    if alert_type.is_empty() {
        return Err(AlertError::Validation("alert type must not be empty".into()));
    }

    let conditions = ConditionGroup::from_json(&input.conditions)
        .map_err(|e| AlertError::Validation(format!("malformed conditions: {e}")))?;

    if conditions.conditions.is_empty() {
        return Err(AlertError::Validation("at least one condition is required".into()));
    }
    if let Some(c) = conditions.conditions.iter().find(|c| !c.value.is_finite()) {
        return Err(AlertError::Validation(format!(
            "condition on {} has a non-finite value",
            c.field
        )));
    }

    if !input.sensitivity.is_finite() || !(0.0..=MAX_SENSITIVITY).contains(&input.sensitivity) {
        return Err(AlertError::Validation(format!(
            "sensitivity must be within [0, {MAX_SENSITIVITY}]"
        )));
    }
    if !(0..=MAX_COOLDOWN_HOURS).contains(&input.cooldown_hours) {
        return Err(AlertError::Validation(format!(
            "cooldown hours must be within [0, {MAX_COOLDOWN_HOURS}]"
        )));
    }

    let post_trigger_action = input
        .post_trigger_action
        .parse::<PostTriggerAction>()
        .map_err(AlertError::Validation)?;

    Ok(ValidatedInput {
        code,
        name,
        alert_type,
        conditions,
        post_trigger_action,
    })
}

/// Copies a template group and overrides condition values from `params`.
///
/// A field-named key is applied first, then the generic `value` key, so the
/// generic key wins when both are present.
pub fn apply_template_params(group: &ConditionGroup, params: &HashMap<String, f64>) -> ConditionGroup {
    let mut out = group.clone();
    for cond in &mut out.conditions {
        if let Some(v) = params.get(cond.field.as_str()) {
            cond.value = *v;
        }
        if let Some(v) = params.get(GENERIC_VALUE_KEY) {
            cond.value = *v;
        }
    }
    out
}

pub struct AlertService {
    repo: Arc<dyn AlertRepository>,
    events_tx: EventSender,
    clock: Clock,
}

impl AlertService {
    pub fn new(repo: Arc<dyn AlertRepository>, events_tx: EventSender) -> Self {
        Self {
            repo,
            events_tx,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> i64 {
        (self.clock)()
    }

    pub fn events(&self) -> &EventSender {
        &self.events_tx
    }

    fn publish_updated(&self) {
        let _ = self.events_tx.send(AlertEvent::AlertsUpdated);
    }

    // ---------------- CRUD ----------------

    pub async fn create_alert(&self, input: AlertInput) -> AlertResult<Alert> {
        let v = validate(&input)?;
        let now = self.now();

        let alert = Alert {
            id: ObjectId::new(),
            code: v.code,
            name: v.name,
            alert_type: v.alert_type,
            conditions: v.conditions,
            is_active: true,
            sensitivity: input.sensitivity,
            cooldown_hours: input.cooldown_hours,
            post_trigger_action: v.post_trigger_action,
            enable_sound: input.enable_sound,
            enable_desktop: input.enable_desktop,
            last_triggered_at: None,
            created_at: now,
            updated_at: now,
        };

        self.repo
            .insert_alert(&alert)
            .await
            .map_err(AlertError::Repository)?;

        tracing::info!(alert_id = %alert.id.to_hex(), code = %alert.code, "alert created");
        self.publish_updated();

        Ok(alert)
    }

    pub async fn update_alert(&self, id: ObjectId, input: AlertInput) -> AlertResult<Alert> {
        let v = validate(&input)?;
        let mut alert = self.get_alert(id).await?;

        alert.code = v.code;
        alert.name = v.name;
        alert.alert_type = v.alert_type;
        alert.conditions = v.conditions;
        alert.sensitivity = input.sensitivity;
        alert.cooldown_hours = input.cooldown_hours;
        alert.post_trigger_action = v.post_trigger_action;
        alert.enable_sound = input.enable_sound;
        alert.enable_desktop = input.enable_desktop;
        alert.updated_at = self.now();

        let found = self
            .repo
            .update_alert(&alert)
            .await
            .map_err(AlertError::Repository)?;
        if !found {
            return Err(AlertError::NotFound(format!("alert {}", id.to_hex())));
        }

        self.publish_updated();
        Ok(alert)
    }

    pub async fn delete_alert(&self, id: ObjectId) -> AlertResult<()> {
        let deleted = self
            .repo
            .delete_alert(id)
            .await
            .map_err(AlertError::Repository)?;
        if !deleted {
            return Err(AlertError::NotFound(format!("alert {}", id.to_hex())));
        }

        self.publish_updated();
        Ok(())
    }

    /// Flips `is_active` and returns the updated alert.
    pub async fn toggle_status(&self, id: ObjectId) -> AlertResult<Alert> {
        let mut alert = self.get_alert(id).await?;
        let now = self.now();
        let active = !alert.is_active;

        let found = self
            .repo
            .toggle_status(id, active, now)
            .await
            .map_err(AlertError::Repository)?;
        if !found {
            return Err(AlertError::NotFound(format!("alert {}", id.to_hex())));
        }

        alert.is_active = active;
        alert.updated_at = now;

        tracing::info!(alert_id = %id.to_hex(), active, "alert status toggled");
        self.publish_updated();

        Ok(alert)
    }

    pub async fn get_alert(&self, id: ObjectId) -> AlertResult<Alert> {
        self.repo
            .find_alert(id)
            .await
            .map_err(AlertError::Repository)?
            .ok_or_else(|| AlertError::NotFound(format!("alert {}", id.to_hex())))
    }

    pub async fn list_alerts(&self) -> AlertResult<Vec<Alert>> {
        self.repo.list_alerts().await.map_err(AlertError::Repository)
    }

    pub async fn list_active_alerts(&self) -> AlertResult<Vec<Alert>> {
        self.repo
            .list_active_alerts()
            .await
            .map_err(AlertError::Repository)
    }

    pub async fn list_active_alerts_for_code(&self, code: &str) -> AlertResult<Vec<Alert>> {
        self.repo
            .list_active_alerts_for_code(&code.trim().to_uppercase())
            .await
            .map_err(AlertError::Repository)
    }

    /// Newest first. `limit` is clamped to at least 1.
    pub async fn list_history(
        &self,
        alert_id: Option<ObjectId>,
        limit: i64,
    ) -> AlertResult<Vec<TriggerHistory>> {
        self.repo
            .list_history(alert_id, limit.max(1))
            .await
            .map_err(AlertError::Repository)
    }

    pub async fn list_templates(&self) -> AlertResult<Vec<AlertTemplate>> {
        self.repo
            .list_templates()
            .await
            .map_err(AlertError::Repository)
    }

    // ---------------- Templates ----------------

    pub async fn instantiate_from_template(
        &self,
        template_id: &str,
        code: &str,
        name: &str,
        params: &HashMap<String, f64>,
    ) -> AlertResult<Alert> {
        let template = self
            .repo
            .find_template(template_id)
            .await
            .map_err(AlertError::Repository)?
            .ok_or_else(|| AlertError::NotFound(format!("template {template_id}")))?;

        let group = apply_template_params(&template.conditions, params);

        let cooldown_hours = match params.get("cooldown_hours") {
            Some(h) if !h.is_finite() || h.fract() != 0.0 => {
                return Err(AlertError::Validation(
                    "cooldown hours must be a whole number".into(),
                ));
            }
            Some(h) => *h as i32,
            None => TEMPLATE_COOLDOWN_HOURS,
        };

        let input = AlertInput {
            code: code.to_string(),
            name: name.to_string(),
            alert_type: template.alert_type.clone(),
            conditions: group.to_json().map_err(AlertError::Validation)?,
            sensitivity: params
                .get("sensitivity")
                .copied()
                .unwrap_or(TEMPLATE_SENSITIVITY),
            cooldown_hours,
            post_trigger_action: PostTriggerAction::Continue.to_string(),
            enable_sound: true,
            enable_desktop: true,
        };

        self.create_alert(input).await
    }

    // ---------------- Lifecycle ----------------

    /// Cooldown gate. Repository errors propagate so the caller can skip
    /// just this alert.
    pub async fn gate(&self, alert: &Alert) -> AlertResult<AlertState> {
        if !alert.is_active {
            return Ok(AlertState::Disabled);
        }

        let cooling = self
            .repo
            .is_in_cooldown(alert.id, self.now())
            .await
            .map_err(AlertError::Repository)?;

        Ok(if cooling {
            AlertState::Cooling
        } else {
            AlertState::Armed
        })
    }

    /// Gate then evaluate. `None` when the alert is cooling or disabled.
    pub async fn check_alert(
        &self,
        alert: &Alert,
        snapshot: &MarketSnapshot,
    ) -> AlertResult<Option<Verdict>> {
        match self.gate(alert).await? {
            AlertState::Armed => Ok(Some(evaluator::evaluate(
                &alert.conditions,
                snapshot,
                alert.sensitivity,
            ))),
            AlertState::Cooling | AlertState::Disabled => Ok(None),
        }
    }

    /// Records a fire and applies the post-trigger action.
    ///
    /// Each write is best effort: a failure is logged and the remaining
    /// steps still run, so the returned notification is always delivered.
    pub async fn fire(
        &self,
        alert: &Alert,
        snapshot: &MarketSnapshot,
        verdict: &Verdict,
    ) -> AlertNotification {
        let now = self.now();
        let alert_id = alert.id.to_hex();

        let entry = TriggerHistory {
            id: ObjectId::new(),
            alert_id: alert.id,
            code: alert.code.clone(),
            name: alert.name.clone(),
            alert_type: alert.alert_type.clone(),
            trigger_price: snapshot.close_price,
            message: verdict.message.clone(),
            triggered_at: now,
        };

        if let Err(e) = self.repo.append_history(&entry).await {
            tracing::warn!(alert_id = %alert_id, error = %e, "failed to record trigger history");
        }

        if let Err(e) = self.repo.update_last_triggered_time(alert.id, now).await {
            tracing::warn!(alert_id = %alert_id, error = %e, "failed to update last triggered time");
        }

        if alert.post_trigger_action.disables_alert() {
            match self.repo.toggle_status(alert.id, false, now).await {
                Ok(true) => {
                    tracing::info!(
                        alert_id = %alert_id,
                        action = %alert.post_trigger_action,
                        "alert disabled after trigger"
                    );
                    self.publish_updated();
                }
                Ok(false) => {
                    tracing::warn!(alert_id = %alert_id, "alert vanished before it could be disabled");
                }
                Err(e) => {
                    tracing::warn!(alert_id = %alert_id, error = %e, "failed to disable alert");
                }
            }
        }

        tracing::info!(
            alert_id = %alert_id,
            code = %alert.code,
            price = snapshot.close_price,
            message = %verdict.message,
            "alert triggered"
        );

        AlertNotification {
            alert_id,
            code: alert.code.clone(),
            name: alert.name.clone(),
            alert_type: alert.alert_type.clone(),
            trigger_price: snapshot.close_price,
            change_percent: snapshot.change_percent,
            message: verdict.message.clone(),
            triggered_at: now,
            enable_sound: alert.enable_sound,
            enable_desktop: alert.enable_desktop,
        }
    }
}
