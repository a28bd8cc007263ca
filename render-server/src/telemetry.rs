//! Tracing setup shared by the server binary and the CLI

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub verbose: bool,
    /// One JSON object per line on stderr
    pub json: bool,
    /// Also write plain logs to this file
    pub file: Option<PathBuf>,
}

/// Install the global subscriber. Keep the returned guard alive for the life
/// of the process or buffered file output is lost.
pub fn init_tracing(options: &LogOptions) -> Result<Option<WorkerGuard>> {
    let level = if options.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "render_server={level},render_sandbox={level},render_cli={level},actix_web=info"
        ))
    });

    let stderr_layer = if options.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .boxed()
    };

    let (file_layer, guard) = match &options.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .context("log file path has no file name")?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(filter)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
