use std::{net::SocketAddr, sync::Arc, time::Duration};

use mongodb::Client;
use tokio::sync::watch;

use market_alerts::{
    config::{self, StorageKind},
    events,
    routes,
    services::{
        alert_monitor::{AlertMonitor, MonitorOptions},
        alerts_service::AlertService,
        finnhub::FinnhubClient,
        memory_repository::MemoryAlertRepository,
        mongo_repository::{self, MongoAlertRepository},
        repository::AlertRepository,
    },
    AppState,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    let repo: Arc<dyn AlertRepository> = match settings.storage {
        StorageKind::Mongo => {
            let client = Client::with_uri_str(&settings.mongodb_uri)
                .await
                .expect("Failed to connect to MongoDB");
            let db = client.database(&settings.mongodb_db);

            if let Err(e) = mongo_repository::ensure_indexes(&db).await {
                tracing::warn!(error = %e, "failed to ensure indexes");
            }
            match mongo_repository::seed_templates(&db).await {
                Ok(n) => tracing::info!(templates = n, "alert templates seeded"),
                Err(e) => tracing::warn!(error = %e, "failed to seed alert templates"),
            }

            Arc::new(MongoAlertRepository::new(db))
        }
        StorageKind::Memory => {
            tracing::info!("using in-memory alert storage; alerts are lost on exit");
            Arc::new(MemoryAlertRepository::with_builtin_templates())
        }
    };

    let (events_tx, _events_rx) = events::channel(settings.events_capacity);
    let service = Arc::new(AlertService::new(repo, events_tx.clone()));

    let finnhub = Arc::new(FinnhubClient::new(settings.finnhub_api_key.clone()));
    if settings.finnhub_api_key.trim().is_empty() {
        tracing::warn!("FINNHUB_API_KEY is not set; every quote fetch will fail");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let options = MonitorOptions {
        check_interval: Duration::from_secs(settings.check_interval_secs),
        history_bars: settings.history_bars,
        bar_period: settings.bar_period,
        fetch_concurrency: settings.fetch_concurrency,
    };
    let monitor = AlertMonitor::with_options(service.clone(), finnhub.clone(), options)
        .with_history(finnhub)
        .with_shutdown(shutdown_rx.clone());

    monitor
        .set_callback(|n| {
            tracing::info!(
                code = %n.code,
                price = n.trigger_price,
                sound = n.enable_sound,
                desktop = n.enable_desktop,
                "notify: {}",
                n.message
            );
        })
        .await;
    monitor.start().await;

    let state = AppState {
        service,
        monitor: monitor.clone(),
        events_tx,
    };
    let app = routes::app(state);

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .unwrap_or_else(|_| std::net::IpAddr::from([127, 0, 0, 1]));
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    let mut server_shutdown = shutdown_rx;
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
        }
        let _ = shutdown_tx.send(true);
    });

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    monitor.stop().await;
}
