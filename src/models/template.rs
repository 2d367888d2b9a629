use serde::{Deserialize, Serialize};

use super::{Condition, ConditionField, ConditionGroup, Operator, Reference};

/// Read-only blueprint for a new alert. Condition values are placeholders
/// meant to be overridden on instantiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertTemplate {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,
    pub description: String,
    pub alert_type: String,
    pub conditions: ConditionGroup,
}

fn template(
    id: &str,
    name: &str,
    description: &str,
    alert_type: &str,
    conditions: ConditionGroup,
) -> AlertTemplate {
    AlertTemplate {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        alert_type: alert_type.to_string(),
        conditions,
    }
}

/// Templates seeded into every repository on startup.
pub fn builtin_templates() -> Vec<AlertTemplate> {
    vec![
        template(
            "price_surge",
            "Price surge",
            "Daily change rises above a percentage.",
            "price_change",
            ConditionGroup::all(vec![Condition::new(
                ConditionField::PriceChangePercent,
                Operator::Gt,
                5.0,
            )]),
        ),
        template(
            "price_drop",
            "Price drop",
            "Daily change falls below a negative percentage.",
            "price_change",
            ConditionGroup::all(vec![Condition::new(
                ConditionField::PriceChangePercent,
                Operator::Lt,
                -5.0,
            )]),
        ),
        template(
            "breakout_high",
            "Breakout above historical high",
            "Intraday high reaches the lookback-window high.",
            "breakout",
            ConditionGroup::all(vec![
                Condition::new(ConditionField::HighPrice, Operator::Gt, 0.0)
                    .with_reference(Reference::HistoricalHigh),
            ]),
        ),
        template(
            "breakdown_low",
            "Breakdown below historical low",
            "Intraday low reaches the lookback-window low.",
            "breakout",
            ConditionGroup::all(vec![
                Condition::new(ConditionField::LowPrice, Operator::Lt, 0.0)
                    .with_reference(Reference::HistoricalLow),
            ]),
        ),
        template(
            "volume_spike",
            "Volume spike",
            "Volume ratio jumps while price is up.",
            "volume",
            ConditionGroup::all(vec![
                Condition::new(ConditionField::VolumeRatio, Operator::Gt, 2.0),
                Condition::new(ConditionField::PriceChangePercent, Operator::Gt, 0.0),
            ]),
        ),
        template(
            "ma_golden_cross",
            "MA5 / MA20 golden cross",
            "MA5 climbs to within the sensitivity band of MA20.",
            "ma_cross",
            ConditionGroup::all(vec![
                Condition::new(ConditionField::Ma5, Operator::Gte, 0.0)
                    .with_reference(Reference::Ma20),
            ]),
        ),
    ]
}
