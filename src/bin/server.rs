//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Entry point for the matching engine service (SPEC_FULL.md §15). Loads configuration,
// constructs the engine and event sink, spawns the periodic expiry/cleanup sweep, and serves
// the REST + WebSocket API until a shutdown signal arrives.
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clob_engine::api::{self, AppState};
use clob_engine::config::Config;
use clob_engine::domain::services::events::EventSink;
use clob_engine::domain::services::matching_engine::{EngineConfig, MatchingEngine, SystemClock};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    info!(bind_addr = %config.bind_addr, "starting matching engine");

    let events = Arc::new(EventSink::new(config.subscriber_queue_capacity));
    let engine = Arc::new(MatchingEngine::new(
        Arc::new(SystemClock),
        events.clone(),
        EngineConfig {
            order_book_depth_default: config.order_book_depth_default,
            trade_ring_size: config.trade_history_ring_size,
            trade_retention_per_pair: config.trade_retention_per_pair,
            trade_retention_hours: config.trade_retention_hours,
            order_book_update_debounce_ms: config.order_book_update_debounce_ms as i64,
            market_stats_update_interval_ms: config.market_stats_update_interval_ms as i64,
        },
    ));

    let sweep_engine = engine.clone();
    let sweep_interval = std::time::Duration::from_secs(config.sweep_interval_secs);
    let sweep_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            sweep_engine.run_sweep();
        }
    });

    let state = Arc::new(AppState::new(engine.clone(), events.clone()));
    let app = api::router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(bind_addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep_task.abort();
    engine.shutdown();
    info!("matching engine stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining");
}
