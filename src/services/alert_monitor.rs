use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
    time::Duration,
};

use futures_util::{stream, StreamExt};
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time,
};

use crate::{
    error::{AlertError, AlertResult},
    events::{AlertEvent, AlertNotification},
    models::{Alert, BarPeriod, MarketSnapshot},
};

use super::{
    alerts_service::AlertService,
    market_data::{build_snapshot, HistoryProvider, QuoteProvider},
};

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// In-process notification hook. Runs on the blocking pool, detached, once
/// per trigger.
pub type AlertCallback = Arc<dyn Fn(AlertNotification) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub check_interval: Duration,
    /// Bars requested per code for MAs and the historical high/low. 0 skips
    /// the history provider entirely.
    pub history_bars: usize,
    pub bar_period: BarPeriod,
    pub fetch_concurrency: usize,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            history_bars: 60,
            bar_period: BarPeriod::Daily,
            fetch_concurrency: 4,
        }
    }
}

struct RunningTask {
    stop_tx: watch::Sender<bool>,
    // dropped on stop; the loop exits at its next wait
    _handle: JoinHandle<()>,
    generation: u64,
}

struct MonitorState {
    running: bool,
    task: Option<RunningTask>,
    interval: Duration,
    callback: Option<AlertCallback>,
    generation: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub alerts: usize,
    pub codes: usize,
    pub codes_failed: Vec<String>,
    pub evaluated: usize,
    pub cooling: usize,
    pub skipped: usize,
    pub fired: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub check_interval_secs: u64,
    pub has_callback: bool,
}

/// Polling loop over all active alerts.
///
/// Cheap to clone; clones share the same lifecycle state.
#[derive(Clone)]
pub struct AlertMonitor {
    service: Arc<AlertService>,
    quotes: Arc<dyn QuoteProvider>,
    history: Option<Arc<dyn HistoryProvider>>,
    options: MonitorOptions,
    state: Arc<Mutex<MonitorState>>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl AlertMonitor {
    pub fn new(service: Arc<AlertService>, quotes: Arc<dyn QuoteProvider>) -> Self {
        Self::with_options(service, quotes, MonitorOptions::default())
    }

    pub fn with_options(
        service: Arc<AlertService>,
        quotes: Arc<dyn QuoteProvider>,
        options: MonitorOptions,
    ) -> Self {
        let interval = if options.check_interval.is_zero() {
            DEFAULT_CHECK_INTERVAL
        } else {
            options.check_interval
        };

        Self {
            service,
            quotes,
            history: None,
            options,
            state: Arc::new(Mutex::new(MonitorState {
                running: false,
                task: None,
                interval,
                callback: None,
                generation: 0,
            })),
            shutdown: None,
        }
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryProvider>) -> Self {
        self.history = Some(history);
        self
    }

    /// Owner-level cancellation: the loop exits once this flips to `true`
    /// or its sender is dropped.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    // ---------------- Lifecycle ----------------

    /// Starts the periodic loop. Returns false if it was already running.
    pub async fn start(&self) -> bool {
        let mut st = self.state.lock().await;
        if st.running {
            tracing::debug!("alert monitor already running");
            return false;
        }

        st.generation += 1;
        let generation = st.generation;
        let (stop_tx, stop_rx) = watch::channel(false);

        let monitor = self.clone();
        let handle = tokio::spawn(async move { monitor.run_loop(stop_rx, generation).await });

        st.running = true;
        st.task = Some(RunningTask {
            stop_tx,
            _handle: handle,
            generation,
        });

        tracing::info!(interval_secs = st.interval.as_secs(), "alert monitor started");
        true
    }

    /// Stops the loop. Idempotent; returns whether it was running.
    pub async fn stop(&self) -> bool {
        let mut st = self.state.lock().await;
        let was_running = st.running;
        st.running = false;

        if let Some(task) = st.task.take() {
            let _ = task.stop_tx.send(true);
        }

        if was_running {
            tracing::info!("alert monitor stopped");
        }
        was_running
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.running
    }

    pub async fn check_interval(&self) -> Duration {
        self.state.lock().await.interval
    }

    /// Applies from the next wait on; a wait already in progress is kept.
    pub async fn set_check_interval(&self, interval: Duration) -> AlertResult<()> {
        if interval.is_zero() {
            return Err(AlertError::Config("check interval must be positive".into()));
        }
        self.state.lock().await.interval = interval;
        Ok(())
    }

    pub async fn set_callback<F>(&self, callback: F)
    where
        F: Fn(AlertNotification) + Send + Sync + 'static,
    {
        self.state.lock().await.callback = Some(Arc::new(callback));
    }

    pub async fn clear_callback(&self) {
        self.state.lock().await.callback = None;
    }

    pub async fn status(&self) -> MonitorStatus {
        let st = self.state.lock().await;
        MonitorStatus {
            running: st.running,
            check_interval_secs: st.interval.as_secs(),
            has_callback: st.callback.is_some(),
        }
    }

    async fn run_loop(self, mut stop_rx: watch::Receiver<bool>, generation: u64) {
        let mut shutdown = self.shutdown.clone();

        loop {
            let wait = self.check_interval().await;

            tokio::select! {
                _ = time::sleep(wait) => {}
                _ = stop_rx.changed() => break,
                _ = wait_for_shutdown(&mut shutdown) => {
                    tracing::info!("alert monitor shutting down");
                    break;
                }
            }

            if *stop_rx.borrow() {
                break;
            }

            match self.run_tick().await {
                Ok(report) => tracing::debug!(
                    alerts = report.alerts,
                    codes = report.codes,
                    fired = report.fired,
                    "alert monitor tick"
                ),
                Err(e) => tracing::warn!(error = %e, "alert monitor tick failed"),
            }
        }

        // a stop()+start() may already have replaced this task
        let mut st = self.state.lock().await;
        if st.task.as_ref().is_some_and(|t| t.generation == generation) {
            st.task = None;
            st.running = false;
        }
    }

    // ---------------- Checks ----------------

    /// One full pass over every active alert.
    pub async fn run_tick(&self) -> AlertResult<TickReport> {
        let alerts = self.service.list_active_alerts().await?;

        let mut report = TickReport {
            alerts: alerts.len(),
            ..Default::default()
        };
        if alerts.is_empty() {
            return Ok(report);
        }

        let codes: BTreeSet<String> = alerts.iter().map(|a| a.code.clone()).collect();
        report.codes = codes.len();

        let snapshots = self.fetch_snapshots(codes, &mut report).await;

        for alert in &alerts {
            match snapshots.get(&alert.code) {
                Some(snapshot) => self.process_alert(alert, snapshot, &mut report).await,
                None => report.skipped += 1,
            }
        }

        Ok(report)
    }

    /// The tick pipeline restricted to one instrument, usable outside the
    /// schedule (e.g. after a manual data refresh).
    pub async fn check_stock_alerts(&self, code: &str) -> AlertResult<TickReport> {
        let alerts = self.service.list_active_alerts_for_code(code).await?;

        let mut report = TickReport {
            alerts: alerts.len(),
            ..Default::default()
        };
        let Some(first) = alerts.first() else {
            return Ok(report);
        };
        report.codes = 1;

        let snapshot = self
            .fetch_snapshot(&first.code)
            .await
            .map_err(AlertError::DataUnavailable)?;

        for alert in &alerts {
            self.process_alert(alert, &snapshot, &mut report).await;
        }

        Ok(report)
    }

    // All fetches finish before anything is evaluated.
    async fn fetch_snapshots(
        &self,
        codes: BTreeSet<String>,
        report: &mut TickReport,
    ) -> HashMap<String, MarketSnapshot> {
        let results: Vec<(String, Result<MarketSnapshot, String>)> = stream::iter(codes)
            .map(|code| async move {
                let res = self.fetch_snapshot(&code).await;
                (code, res)
            })
            .buffer_unordered(self.options.fetch_concurrency.max(1))
            .collect()
            .await;

        let mut snapshots = HashMap::with_capacity(results.len());
        for (code, res) in results {
            match res {
                Ok(s) => {
                    snapshots.insert(code, s);
                }
                Err(e) => {
                    tracing::warn!(code = %code, error = %e, "market data unavailable, skipping code this tick");
                    report.codes_failed.push(code);
                }
            }
        }
        report.codes_failed.sort();

        snapshots
    }

    // Only the quote is required. Without bars the MA and historical values
    // stay 0 and reference rules report the value as unavailable.
    async fn fetch_snapshot(&self, code: &str) -> Result<MarketSnapshot, String> {
        let quote = self.quotes.get_quote(code).await?;

        let bars = match &self.history {
            Some(history) if self.options.history_bars > 0 => match history
                .get_bars(code, self.options.history_bars, self.options.bar_period)
                .await
            {
                Ok(bars) => bars,
                Err(e) => {
                    tracing::warn!(code = %code, error = %e, "history unavailable, using quote only");
                    Vec::new()
                }
            },
            _ => Vec::new(),
        };

        Ok(build_snapshot(code, &quote, &bars, self.service.now()))
    }

    // gate -> evaluate -> fire -> notify, strictly in that order
    async fn process_alert(&self, alert: &Alert, snapshot: &MarketSnapshot, report: &mut TickReport) {
        let verdict = match self.service.check_alert(alert, snapshot).await {
            Ok(Some(v)) => v,
            Ok(None) => {
                report.cooling += 1;
                return;
            }
            Err(e) => {
                tracing::warn!(alert_id = %alert.id.to_hex(), error = %e, "cooldown check failed, skipping alert");
                report.skipped += 1;
                return;
            }
        };

        report.evaluated += 1;
        if !verdict.fired {
            return;
        }

        let notification = self.service.fire(alert, snapshot, &verdict).await;
        report.fired += 1;

        self.dispatch(notification).await;
    }

    async fn dispatch(&self, notification: AlertNotification) {
        let callback = self.state.lock().await.callback.clone();

        if let Some(cb) = callback {
            let payload = notification.clone();
            // blocking pool: a slow observer cannot stall a runtime worker
            tokio::task::spawn_blocking(move || cb(payload));
        }

        // no subscribers is fine
        let _ = self
            .service
            .events()
            .send(AlertEvent::AlertTriggered(notification));
    }
}

async fn wait_for_shutdown(shutdown: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = shutdown else {
        return std::future::pending().await;
    };

    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
