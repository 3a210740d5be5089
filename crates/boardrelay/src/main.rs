use std::sync::Arc;

use boardrelay::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

/// Force-closes boards whenever the process receives SIGUSR1.
#[cfg(unix)]
fn reset_on_signal(admin: AdminHandle<MemoryStore>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut usr1 = match signal(SignalKind::user_defined1()) {
        Ok(usr1) => usr1,
        Err(e) => {
            tracing::warn!(error = %e, "reset signal unavailable");
            return;
        }
    };
    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            if let Err(e) = admin.reset_boards().await {
                tracing::error!(error = %e, "board reset failed");
            }
        }
    });
}

#[cfg(not(unix))]
fn reset_on_signal(_admin: AdminHandle<MemoryStore>) {}

#[tokio::main]
async fn main() -> Result<(), BoardRelayError> {
    setup_logging();

    let config = ServerConfig::from_env();
    tracing::info!(?config, "configuration loaded");

    let store = Arc::new(MemoryStore::new(config.store_config()));
    let server = BoardRelayServer::<MemoryStore>::builder()
        .with_config(&config)
        .build(store)
        .await?;

    reset_on_signal(server.admin());

    tracing::info!(addr = %config.bind_addr(), "listening");
    server.run().await
}
