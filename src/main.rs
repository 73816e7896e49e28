// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc, time::Instant};

use anyhow::Context;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use widget_dashboard::domain::data_source::{from_async, from_fn};
use widget_dashboard::domain::metric::{MetricValue, ValueFormat};
use widget_dashboard::infrastructure::catalog::register_all;
use widget_dashboard::infrastructure::config::load_config;
use widget_dashboard::infrastructure::sources::UptimeSource;
use widget_dashboard::presentation::{app_state::AppState, router};
use widget_dashboard::{Dashboard, DashboardManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let started = Instant::now();
    let config = load_config().context("failed to load configuration")?;

    // Registry, populated from configuration or with the built-in overview
    let manager = Arc::new(DashboardManager::new());
    if register_all(&manager, &config, started)? == 0 {
        manager.register(overview_dashboard(&manager, started)?);
    }

    manager.start_auto_refresh(config.refresh.auto_refresh_interval())?;

    let router = router(Arc::new(AppState {
        manager: manager.clone(),
    }));

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting widget-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.stop_auto_refresh().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("shutting down");
}

fn overview_dashboard(manager: &DashboardManager, started: Instant) -> anyhow::Result<Dashboard> {
    let dashboard = manager
        .create("main", "Main Dashboard")
        .description("Service overview")
        .metric("uptime", "Uptime (s)", Arc::new(UptimeSource::new(started)))
        .refresh_every(5)
        .metric(
            "workers",
            "Worker Threads",
            from_fn(|| {
                let workers = std::thread::available_parallelism()?.get();
                Ok(MetricValue::new(workers as f64, "Available parallelism").with_format(ValueFormat::Number))
            }),
        )
        .refresh_every(3600)
        .chart(
            "tasks",
            "Runtime Tasks",
            from_async(|| async {
                let metrics = tokio::runtime::Handle::current().metrics();
                Ok::<_, anyhow::Error>(json!({
                    "labels": ["workers", "alive tasks"],
                    "values": [metrics.num_workers(), metrics.num_alive_tasks()],
                }))
            }),
        )
        .refresh_every(10)
        .row(["uptime", "workers"])
        .row(["tasks"])
        .build()?;

    Ok(dashboard)
}
