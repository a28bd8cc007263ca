//! Render server binary

use anyhow::{Context, Result};
use render_sandbox::RenderService;
use render_server::telemetry::{init_tracing, LogOptions};
use render_server::{run_server, ServerConfig};
use tracing::info;

#[actix_web::main]
async fn main() -> Result<()> {
    let _guard = init_tracing(&LogOptions::default())?;

    let config = ServerConfig::from_env().context("invalid configuration")?;
    info!("Configuration loaded");

    let service = RenderService::from_config(&config.sandbox).await;
    run_server(config, service).await?;

    Ok(())
}
