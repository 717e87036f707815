use anyhow::Result;
use auditmon_notify::ReportMailer;
use auditmon_storage::Store;
use auditmon_watcher::connector::NullConnector;
use auditmon_watcher::Connector;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use auditmon_server::config::ServerConfig;
use auditmon_server::report_scheduler::ReportScheduler;
use auditmon_server::scheduler::WatchScheduler;
use auditmon_server::state::AppState;
use auditmon_server::{app, seed};

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  auditmon-server [config.toml]                              Start the server");
    eprintln!("  auditmon-server init-accounts <config.toml> <seed.json>    Initialize monitored accounts");
}

#[tokio::main]
async fn main() -> Result<()> {
    auditmon_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("auditmon=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("init-accounts") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-accounts requires <config.toml> and <seed.json> arguments")
            })?;
            let seed_path = args.get(3).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-accounts requires <seed.json> argument")
            })?;
            seed::run_init_accounts(config_path, seed_path).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        db = %config.database.url,
        "auditmon-server starting"
    );

    let store = Arc::new(Store::new(&config.database.url).await?);

    // The provider SDK connector is wired in at build time; without one
    // the watchers see empty listings and only push ingestion and the
    // scanner endpoints feed the pipeline.
    let connector: Arc<dyn Connector> = Arc::new(NullConnector);

    let state = AppState {
        store: store.clone(),
        config: Arc::new(config.clone()),
        start_time: Utc::now(),
    };

    let watch_handle = if config.watch.enabled {
        let scheduler = WatchScheduler::new(
            store.clone(),
            connector,
            config.watch.tick_secs,
            config.watch.interval_secs,
        );
        Some(tokio::spawn(async move {
            scheduler.run().await;
        }))
    } else {
        tracing::info!("Watch scheduler disabled");
        None
    };

    let report_handle = if config.report.enabled && !config.smtp.host.is_empty() {
        let mailer = Arc::new(ReportMailer::new(
            &config.smtp.host,
            config.smtp.port,
            config.smtp.username.as_deref(),
            config.smtp.password.as_deref(),
            &config.smtp.from,
        )?);
        let scheduler = ReportScheduler::new(
            store.clone(),
            mailer,
            config.report.tick_secs,
            config.report.interval_secs,
            config.report.days,
        );
        Some(tokio::spawn(async move {
            scheduler.run().await;
        }))
    } else {
        tracing::info!("Report scheduler disabled");
        None
    };

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    tracing::info!(http = %http_addr, "Server started");

    let server = axum::serve(listener, app.into_make_service());
    tokio::select! {
        result = server.with_graceful_shutdown(async { signal::ctrl_c().await.ok(); }) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server error");
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down gracefully");
        }
    }

    if let Some(h) = watch_handle {
        h.abort();
    }
    if let Some(h) = report_handle {
        h.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}
