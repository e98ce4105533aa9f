//! `visa-sync` daemon: keeps a realtime connection open, applies events to
//! the local cache, and logs every inbound frame until Ctrl-C.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use visa_sync::adapters::network::WatchNetworkStatus;
use visa_sync::application::{token_provider, SyncRuntime};
use visa_sync::config::{AppConfig, LoggingConfig};
use visa_sync::domain::realtime::{ListenerChannel, TransportMessage};

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| logging.env_filter())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);
    config.validate()?;

    tracing::info!("Starting visa-sync");

    let auth = token_provider(&config.auth);
    let network = Arc::new(WatchNetworkStatus::always_online());
    let runtime = SyncRuntime::init(&config, auth, network).await?;

    runtime
        .realtime()
        .on(ListenerChannel::All, |message: &TransportMessage| {
            tracing::info!(
                message_type = %message.message_type,
                data = %message.data,
                "Realtime event"
            );
        });

    match runtime.start().await {
        Ok(true) => tracing::info!("Realtime connection established"),
        Ok(false) => tracing::warn!("Not connected; waiting for a token or network"),
        Err(e) => tracing::warn!(error = %e, "Initial connect failed; reconnects are scheduled"),
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    runtime.dispose().await;
    Ok(())
}
