use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Live quote as returned by a quote provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub pre_close: f64,
    pub change_percent: f64,
    pub volume: f64,
    pub volume_ratio: f64,
}

/// One completed K-line bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: i64,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl FromStr for BarPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "d" => Ok(BarPeriod::Daily),
            "weekly" | "w" => Ok(BarPeriod::Weekly),
            "monthly" | "m" => Ok(BarPeriod::Monthly),
            other => Err(format!("unknown bar period '{other}'")),
        }
    }
}

/// Per-instrument values one tick evaluates against. Rebuilt every tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub code: String,

    pub close_price: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub pre_close_price: f64,
    pub change_percent: f64,
    pub volume: f64,
    pub volume_ratio: f64,

    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
    pub historical_high: f64,
    pub historical_low: f64,

    pub fetched_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_period_parses_names_and_letters() {
        assert_eq!("Weekly".parse::<BarPeriod>(), Ok(BarPeriod::Weekly));
        assert_eq!(" m ".parse::<BarPeriod>(), Ok(BarPeriod::Monthly));
        assert_eq!("daily".parse::<BarPeriod>(), Ok(BarPeriod::Daily));
        assert!("hourly".parse::<BarPeriod>().is_err());
    }
}
