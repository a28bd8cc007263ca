//! CLI command implementations

use anyhow::{anyhow, bail, Context, Result};
use render_common::{RenderRequest, RenderResponse};
use render_sandbox::{probe_engine, RenderService};
use render_server::{run_server, ServerConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Stderr excerpt printed when a render fails
const DIAGNOSTIC_TAIL_LINES: usize = 20;

pub async fn execute_serve(
    host: Option<String>,
    port: Option<u16>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let mut config = ServerConfig::from_env().context("Invalid configuration")?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(secs) = timeout_secs {
        config.sandbox.limits.max_duration = positive_timeout(secs)?;
    }

    let service = RenderService::from_config(&config.sandbox).await;
    run_server(config, service)
        .await
        .context("HTTP server failed")
}

/// Run one job through the same pipeline the server uses and print the
/// response body.
pub async fn execute_render(
    file: PathBuf,
    quality: Option<String>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let code = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut body = RenderRequest::new(code);
    if let Some(quality) = quality {
        body = body.with_quality(quality);
    }
    let mut request = body
        .into_job_request()
        .map_err(|e| anyhow!("Invalid request: {}", e))?;
    if let Some(secs) = timeout_secs {
        request = request.with_timeout(positive_timeout(secs)?);
    }

    let config = ServerConfig::from_env().context("Invalid configuration")?;
    let service = RenderService::from_config(&config.sandbox).await;
    info!(file = %file.display(), "Rendering");

    match service.render(request).await {
        Ok(outcome) => {
            let response = RenderResponse::success(
                outcome.reference.key,
                outcome.reference.uri,
                outcome.job_id,
            );
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(failure) => {
            if let Some(logs) = &failure.logs {
                let tail = last_lines(&logs.stderr, DIAGNOSTIC_TAIL_LINES);
                if !tail.is_empty() {
                    error!("Renderer output:\n{}", tail);
                }
            }
            Err(anyhow!(failure))
        }
    }
}

pub async fn execute_check(engine: Option<String>) -> Result<()> {
    dotenvy::dotenv().ok();
    let engine = engine
        .or_else(|| std::env::var("CONTAINER_ENGINE").ok())
        .unwrap_or_else(|| "docker".to_string());

    let status = probe_engine(&engine).await;
    println!("{}: {}", engine, status);
    if let Some(hint) = status.hint() {
        println!("  {}", hint);
    }
    if !status.is_ok() {
        bail!("{} is not usable", engine);
    }
    Ok(())
}

fn positive_timeout(secs: u64) -> Result<Duration> {
    if secs == 0 {
        bail!("Timeout must be at least one second");
    }
    Ok(Duration::from_secs(secs))
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}
