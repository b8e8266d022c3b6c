//! Standalone movement server backed by in-memory stores.
//!
//! `RUST_LOG` controls log output (default `info`), `TERRABOUND_BIND`
//! the listen address.

use std::sync::Arc;

use terrabound::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ServerConfig::default();
    if let Ok(addr) = std::env::var("TERRABOUND_BIND") {
        config.bind_addr = addr;
    }
    tracing::info!(bind_addr = %config.bind_addr, "starting movement server");

    let server = TerraboundServerBuilder::new()
        .config(config)
        .build(
            DevAuthenticator,
            Arc::new(InMemoryRegistry::new()),
            Arc::new(InMemoryAccountStore::new()),
        )
        .await?;

    server.run().await?;
    Ok(())
}
