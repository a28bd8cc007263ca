mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use render_server::telemetry::{init_tracing, LogOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "render")]
#[command(about = "Render animation scripts in disposable containers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP service
    Serve {
        /// Bind host (overrides RENDER_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides RENDER_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Render timeout in seconds (overrides RENDER_TIMEOUT_SECS)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,

        /// Emit logs as JSON lines
        #[arg(long)]
        json_logs: bool,

        /// Also write logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Render one scene file and upload the result
    Render {
        /// Scene source file
        file: PathBuf,

        /// Quality tier (-ql, -qm, -qh, -qp, -qk or l, m, h, p, k)
        #[arg(short, long, allow_hyphen_values = true)]
        quality: Option<String>,

        /// Render timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Check that the container engine is installed and running
    Check {
        /// Engine binary (defaults to CONTAINER_ENGINE or docker)
        #[arg(short, long)]
        engine: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            timeout,
            verbose,
            json_logs,
            log_file,
        } => {
            let _guard = init_tracing(&LogOptions {
                verbose,
                json: json_logs,
                file: log_file,
            })?;
            commands::execute_serve(host, port, timeout).await
        }
        Commands::Render {
            file,
            quality,
            timeout,
            verbose,
        } => {
            let _guard = init_tracing(&LogOptions {
                verbose,
                ..Default::default()
            })?;
            commands::execute_render(file, quality, timeout).await
        }
        Commands::Check { engine } => commands::execute_check(engine).await,
    }
}
