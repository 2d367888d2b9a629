use std::fmt;

use serde::{Deserialize, Serialize};

/// Snapshot value a condition compares against.
///
/// Names outside the known set are kept as `Unknown` so a stored rule always
/// round-trips, and the evaluator reports them instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionField {
    PriceChangePercent,
    ClosePrice,
    OpenPrice,
    HighPrice,
    LowPrice,
    PreClosePrice,
    Volume,
    VolumeRatio,
    Ma5,
    Ma10,
    Ma20,
    Unknown(String),
}

impl ConditionField {
    pub fn as_str(&self) -> &str {
        match self {
            ConditionField::PriceChangePercent => "price_change_percent",
            ConditionField::ClosePrice => "close_price",
            ConditionField::OpenPrice => "open_price",
            ConditionField::HighPrice => "high_price",
            ConditionField::LowPrice => "low_price",
            ConditionField::PreClosePrice => "pre_close_price",
            ConditionField::Volume => "volume",
            ConditionField::VolumeRatio => "volume_ratio",
            ConditionField::Ma5 => "ma5",
            ConditionField::Ma10 => "ma10",
            ConditionField::Ma20 => "ma20",
            ConditionField::Unknown(s) => s,
        }
    }
}

impl From<String> for ConditionField {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "price_change_percent" | "change_percent" => ConditionField::PriceChangePercent,
            "close_price" | "price" => ConditionField::ClosePrice,
            "open_price" => ConditionField::OpenPrice,
            "high_price" => ConditionField::HighPrice,
            "low_price" => ConditionField::LowPrice,
            "pre_close_price" => ConditionField::PreClosePrice,
            "volume" => ConditionField::Volume,
            "volume_ratio" => ConditionField::VolumeRatio,
            "ma5" => ConditionField::Ma5,
            "ma10" => ConditionField::Ma10,
            "ma20" => ConditionField::Ma20,
            _ => ConditionField::Unknown(s),
        }
    }
}

impl From<ConditionField> for String {
    fn from(f: ConditionField) -> Self {
        f.as_str().to_string()
    }
}

impl fmt::Display for ConditionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
    Unknown(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Unknown(s) => s,
        }
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        match s.trim() {
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            "==" => Operator::Eq,
            "!=" => Operator::Ne,
            _ => Operator::Unknown(s),
        }
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computed threshold used instead of the literal `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Reference {
    HistoricalHigh,
    HistoricalLow,
    Ma20,
    Unknown(String),
}

impl Reference {
    pub fn as_str(&self) -> &str {
        match self {
            Reference::HistoricalHigh => "historical_high",
            Reference::HistoricalLow => "historical_low",
            Reference::Ma20 => "ma20",
            Reference::Unknown(s) => s,
        }
    }
}

impl From<String> for Reference {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "historical_high" => Reference::HistoricalHigh,
            "historical_low" => Reference::HistoricalLow,
            "ma20" => Reference::Ma20,
            _ => Reference::Unknown(s),
        }
    }
}

impl From<Reference> for String {
    fn from(r: Reference) -> Self {
        r.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Logic {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: ConditionField,
    pub operator: Operator,
    pub value: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,
}

impl Condition {
    pub fn new(field: ConditionField, operator: Operator, value: f64) -> Self {
        Self {
            field,
            operator,
            value,
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl ConditionGroup {
    pub fn all(conditions: Vec<Condition>) -> Self {
        Self {
            logic: Logic::And,
            conditions,
        }
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Self {
            logic: Logic::Or,
            conditions,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|e| e.to_string())
    }
}
