//! scrapemeter exporter
//!
//! - Scrape endpoint: GET /metrics (configurable) in Prometheus text format
//! - Demo workload: two counters, a histogram and a gauge fed with random data
//! - Graceful shutdown on SIGINT/SIGTERM, then meter shutdown

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use scrapemeter_core::error::{MeterError, Result};
use scrapemeter_exporter::{app_state, config, demo, router};

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "scrapemeter-exporter failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "scrapemeter.yaml".to_string());
    let cfg = config::load_or_default(&path)?;
    let listen = cfg.exporter.listen_addr()?;

    let state = app_state::AppState::new(cfg)?;
    let meter = state.meter().clone();
    let scheduler = state.scheduler();

    demo::register_runtime_metrics(&meter, &scheduler)?;

    let workload = if state.cfg().demo.enabled {
        let instruments = demo::DemoInstruments::register(&meter, &scheduler)?;
        Some(tokio::spawn(instruments.run(state.cfg().demo.max_sleep_ms)))
    } else {
        None
    };

    let scrape_path = state.cfg().exporter.path.clone();
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MeterError::Internal(format!("bind {listen} failed: {e}")))?;
    tracing::info!(%listen, path = %scrape_path, "scrapemeter-exporter listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MeterError::Internal(format!("server failed: {e}")));

    if let Some(handle) = workload {
        handle.abort();
    }
    meter.shutdown();
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
