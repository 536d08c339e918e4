//! Rates monitor
//!
//! Prints averaged BTC/USD and EUR/USD rates until interrupted

use std::sync::Arc;

use chrono::Utc;
use tokio::signal;
use tracing::{error, info};

use rates_monitor::{logging, settings, InstrumentSession, LogSink};
use rates_price_feed::ExtractorRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config_path = settings::config_path();
    let config = settings::load(&config_path)?;

    // Initialize logging
    logging::init(&LogSink::from_setting(&config.log_file))?;

    info!(
        "Rates monitor v{} started with settings from {}",
        env!("CARGO_PKG_VERSION"),
        config_path
    );

    let registry = Arc::new(ExtractorRegistry::with_defaults());
    let mut session = InstrumentSession::new(&config, registry);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(config.status_interval());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                println!("{}", session.status(Utc::now()));
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }

    // Status printing has stopped, so the pools can be torn down
    info!("Stopping workers");
    session.shutdown().await;

    info!("Rates monitor completed");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        }
        _ = terminate => {
            info!("Received termination signal");
        }
    }
}
