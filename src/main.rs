//! mtk-host - HTTP host for converted CAD model bundles
//!
//! Stores `<name>_mtk` bundle folders under an upload root, serves their
//! contents to the viewer front-end (raw files or a base64 bulk listing),
//! and shells out to the licensed conversion and analysis tools on demand.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use mtk_host::config::{Cli, Config};
use mtk_host::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting MTK Model Host (mtk-host) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli = Cli::parse();
    let config = Config::load(&cli)?;
    info!("Upload root: {}", config.upload_root.display());
    if config.tools.converter.is_none() {
        info!("No converter configured - running as static host only");
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("mtk-host listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
