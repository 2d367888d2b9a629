#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};

use market_alerts::{
    events::{self, AlertEvent},
    models::{AlertInput, Bar, BarPeriod, Quote},
    services::{
        alert_monitor::{AlertMonitor, MonitorOptions},
        alerts_service::{AlertService, Clock},
        market_data::{HistoryProvider, QuoteProvider},
        memory_repository::MemoryAlertRepository,
    },
};

pub const T0: i64 = 1_700_000_000;
pub const HOUR: i64 = 3600;

#[derive(Clone)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self(Arc::new(AtomicI64::new(start)))
    }

    pub fn clock(&self) -> Clock {
        let t = self.0.clone();
        Arc::new(move || t.load(Ordering::SeqCst))
    }

    pub fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, t: i64) {
        self.0.store(t, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeQuotes {
    quotes: Mutex<HashMap<String, Quote>>,
    calls: AtomicUsize,
}

impl FakeQuotes {
    pub async fn set(&self, code: &str, quote: Quote) {
        self.quotes.lock().await.insert(code.to_string(), quote);
    }

    pub async fn remove(&self, code: &str) {
        self.quotes.lock().await.remove(code);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteProvider for FakeQuotes {
    async fn get_quote(&self, code: &str) -> Result<Quote, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.quotes
            .lock()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| format!("quote for {code} timed out"))
    }
}

#[derive(Default)]
pub struct FakeHistory {
    bars: Mutex<HashMap<String, Vec<Bar>>>,
}

impl FakeHistory {
    pub async fn set(&self, code: &str, bars: Vec<Bar>) {
        self.bars.lock().await.insert(code.to_string(), bars);
    }
}

#[async_trait]
impl HistoryProvider for FakeHistory {
    async fn get_bars(&self, code: &str, count: usize, _period: BarPeriod) -> Result<Vec<Bar>, String> {
        let bars = self
            .bars
            .lock()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| format!("no bars for {code}"))?;
        let skip = bars.len().saturating_sub(count);
        Ok(bars.into_iter().skip(skip).collect())
    }
}

/// Flat bars at `close`, each spanning close ± spread.
pub fn flat_bars(n: usize, close: f64, spread: f64) -> Vec<Bar> {
    (0..n)
        .map(|i| Bar {
            time: i as i64,
            open: close,
            close,
            high: close + spread,
            low: close - spread,
            volume: 1_000.0,
        })
        .collect()
}

pub fn quote_with_change(price: f64, change_percent: f64) -> Quote {
    Quote {
        price,
        open: price,
        high: price,
        low: price,
        pre_close: price / (1.0 + change_percent / 100.0),
        change_percent,
        volume: 10_000.0,
        volume_ratio: 1.0,
    }
}

pub fn input(code: &str, conditions: &str) -> AlertInput {
    AlertInput {
        code: code.to_string(),
        name: format!("{code} Corp"),
        alert_type: "price_change".to_string(),
        conditions: conditions.to_string(),
        sensitivity: 0.001,
        cooldown_hours: 1,
        post_trigger_action: "continue".to_string(),
        enable_sound: true,
        enable_desktop: false,
    }
}

pub const SURGE_5: &str =
    r#"{"logic":"AND","conditions":[{"field":"price_change_percent","operator":">","value":5}]}"#;

pub struct Harness {
    pub repo: Arc<MemoryAlertRepository>,
    pub service: Arc<AlertService>,
    pub quotes: Arc<FakeQuotes>,
    pub clock: ManualClock,
    pub events_rx: broadcast::Receiver<AlertEvent>,
    pub monitor: AlertMonitor,
}

pub fn harness() -> Harness {
    harness_with(MonitorOptions::default())
}

pub fn harness_with(options: MonitorOptions) -> Harness {
    let repo = Arc::new(MemoryAlertRepository::with_builtin_templates());
    let clock = ManualClock::new(T0);
    let (events_tx, events_rx) = events::channel(64);

    let service = Arc::new(AlertService::new(repo.clone(), events_tx).with_clock(clock.clock()));
    let quotes = Arc::new(FakeQuotes::default());
    let monitor = AlertMonitor::with_options(service.clone(), quotes.clone(), options);

    Harness {
        repo,
        service,
        quotes,
        clock,
        events_rx,
        monitor,
    }
}

/// Drains the broadcast receiver, keeping only trigger payloads.
pub fn triggered(rx: &mut broadcast::Receiver<AlertEvent>) -> Vec<events::AlertNotification> {
    let mut out = Vec::new();
    while let Ok(evt) = rx.try_recv() {
        if let AlertEvent::AlertTriggered(n) = evt {
            out.push(n);
        }
    }
    out
}
