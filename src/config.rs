use std::env;

use crate::models::BarPeriod;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub finnhub_api_key: String,
    pub storage: StorageKind,

    pub check_interval_secs: u64,
    pub history_bars: usize,
    pub bar_period: BarPeriod,
    pub fetch_concurrency: usize,
    pub events_capacity: usize,
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri = env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB")
        .unwrap_or_else(|_| "market_alerts".to_string());

    let host = env::var("HOST")
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = parsed("PORT", 3000u16);

    let finnhub_api_key = env::var("FINNHUB_API_KEY").unwrap_or_default();

    let storage = match env::var("ALERT_STORAGE").as_deref().map(str::trim) {
        Ok("memory") => StorageKind::Memory,
        _ => StorageKind::Mongo,
    };

    Settings {
        mongodb_uri,
        mongodb_db,
        host,
        port,
        finnhub_api_key,
        storage,
        check_interval_secs: parsed("ALERT_CHECK_INTERVAL_SECS", 10u64).max(1),
        history_bars: parsed("ALERT_HISTORY_BARS", 60usize),
        bar_period: parsed("ALERT_BAR_PERIOD", BarPeriod::Daily),
        fetch_concurrency: parsed("ALERT_FETCH_CONCURRENCY", 4usize).max(1),
        events_capacity: parsed("ALERT_EVENTS_CAPACITY", 64usize).max(1),
    }
}
