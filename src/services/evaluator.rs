//! Condition evaluation against a market snapshot.
//!
//! Everything here is a pure function of `(group, snapshot, sensitivity)`.
//! Malformed rules never error: they come back as a non-firing [`Verdict`]
//! carrying a diagnostic message.

use crate::models::{
    Condition, ConditionField, ConditionGroup, Logic, MarketSnapshot, Operator, Reference,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub fired: bool,
    pub message: String,
}

impl Verdict {
    fn hit(message: String) -> Self {
        Self { fired: true, message }
    }

    fn miss(message: String) -> Self {
        Self { fired: false, message }
    }
}

/// Resolves a field to its snapshot value. `None` for unknown fields.
pub fn field_value(field: &ConditionField, snapshot: &MarketSnapshot) -> Option<f64> {
    let v = match field {
        ConditionField::PriceChangePercent => snapshot.change_percent,
        ConditionField::ClosePrice => snapshot.close_price,
        ConditionField::OpenPrice => snapshot.open_price,
        ConditionField::HighPrice => snapshot.high_price,
        ConditionField::LowPrice => snapshot.low_price,
        ConditionField::PreClosePrice => snapshot.pre_close_price,
        ConditionField::Volume => snapshot.volume,
        ConditionField::VolumeRatio => snapshot.volume_ratio,
        ConditionField::Ma5 => snapshot.ma5,
        ConditionField::Ma10 => snapshot.ma10,
        ConditionField::Ma20 => snapshot.ma20,
        ConditionField::Unknown(_) => return None,
    };
    Some(v)
}

/// `None` when the operator is not one of the six supported ones.
pub fn compare(actual: f64, operator: &Operator, value: f64, sensitivity: f64) -> Option<bool> {
    let hit = match operator {
        Operator::Gt => actual > value,
        Operator::Gte => actual >= value,
        Operator::Lt => actual < value,
        Operator::Lte => actual <= value,
        Operator::Eq => (actual - value).abs() <= sensitivity,
        Operator::Ne => (actual - value).abs() > sensitivity,
        Operator::Unknown(_) => return None,
    };
    Some(hit)
}

pub fn evaluate_condition(cond: &Condition, snapshot: &MarketSnapshot, sensitivity: f64) -> Verdict {
    let Some(actual) = field_value(&cond.field, snapshot) else {
        return Verdict::miss(format!("unknown field '{}'", cond.field));
    };

    if let Some(verdict) = evaluate_reference(cond, actual, snapshot, sensitivity) {
        return verdict;
    }

    match compare(actual, &cond.operator, cond.value, sensitivity) {
        Some(fired) => Verdict {
            fired,
            message: format!(
                "{} {:.2} {} {:.2}",
                cond.field, actual, cond.operator, cond.value
            ),
        },
        None => Verdict::miss(format!("unsupported operator '{}'", cond.operator)),
    }
}

// Reference-relative rules. Returns None when the field/reference pair has no
// relative rule, in which case the literal comparison applies.
fn evaluate_reference(
    cond: &Condition,
    actual: f64,
    snapshot: &MarketSnapshot,
    sensitivity: f64,
) -> Option<Verdict> {
    let reference = cond.reference.as_ref()?;

    let (base, fired, verb) = match (&cond.field, reference) {
        (ConditionField::HighPrice, Reference::HistoricalHigh) => {
            let base = snapshot.historical_high;
            (base, actual > base * (1.0 - sensitivity), "broke above")
        }
        (ConditionField::LowPrice, Reference::HistoricalLow) => {
            let base = snapshot.historical_low;
            (base, actual < base * (1.0 + sensitivity), "broke below")
        }
        (ConditionField::Ma5, Reference::Ma20) => {
            let base = snapshot.ma20;
            (base, actual >= base * (1.0 - sensitivity), "crossed above")
        }
        _ => return None,
    };

    // zero means the history provider had nothing for this code
    if base <= 0.0 {
        return Some(Verdict::miss(format!("{} unavailable", reference.as_str())));
    }

    let message = if fired {
        format!("{} {:.2} {} {} {:.2}", cond.field, actual, verb, reference.as_str(), base)
    } else {
        format!("{} {:.2} has not reached {} {:.2}", cond.field, actual, reference.as_str(), base)
    };

    Some(Verdict { fired, message })
}

pub fn evaluate(group: &ConditionGroup, snapshot: &MarketSnapshot, sensitivity: f64) -> Verdict {
    if group.conditions.is_empty() {
        return Verdict::miss("no conditions".to_string());
    }

    match group.logic {
        Logic::And => {
            let mut first: Option<String> = None;
            for cond in &group.conditions {
                let v = evaluate_condition(cond, snapshot, sensitivity);
                if !v.fired {
                    return v;
                }
                first.get_or_insert(v.message);
            }
            Verdict::hit(first.unwrap_or_default())
        }
        Logic::Or => {
            for cond in &group.conditions {
                let v = evaluate_condition(cond, snapshot, sensitivity);
                if v.fired {
                    return v;
                }
            }
            Verdict::miss(format!("none of {} conditions met", group.conditions.len()))
        }
    }
}
