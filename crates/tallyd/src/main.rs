//! tallyd: the Tally daemon.
//!
//! Single binary that assembles the Tally subsystems:
//! - State store (redb)
//! - Metrics engine
//! - REST API + Prometheus endpoint
//!
//! # Usage
//!
//! ```text
//! tallyd serve --config /etc/tally/tally.toml --port 8480 --data-dir /var/lib/tally
//! tallyd check-config --config /etc/tally/tally.toml
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tally_core::TallyConfig;
use tally_metrics::{EngineOptions, MetricsEngine};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tallyd", about = "Tally metrics daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the metrics API.
    Serve {
        /// Path to tally.toml. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides the config file).
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for the metric store (overrides the config file).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Parse and validate a config file, then print the effective settings.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Serve {
            config,
            port,
            data_dir,
        } => {
            let config = resolve_config(config.as_deref(), port, data_dir)?;
            run_serve(config).await
        }
        Command::CheckConfig { config } => {
            let config = TallyConfig::from_file(&config)?;
            let vocabulary = config.vocabulary()?;
            println!("{}", config.to_toml_string()?);
            let names: Vec<_> = vocabulary.iter().collect();
            info!(metrics = vocabulary.len(), names = %names.join(","), "config ok");
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tallyd=debug,tally_metrics=debug"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Load the config file (if any) and apply CLI overrides.
fn resolve_config(
    path: Option<&Path>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<TallyConfig> {
    let mut config = match path {
        Some(path) => TallyConfig::from_file(path)?,
        None => TallyConfig::default(),
    };
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.store.data_dir = data_dir;
    }
    Ok(config)
}

async fn run_serve(config: TallyConfig) -> anyhow::Result<()> {
    info!("Tally daemon starting");

    // Ensure data directory exists.
    std::fs::create_dir_all(&config.store.data_dir)?;
    let db_path = config.store.data_dir.join("tally.redb");

    // ── Initialize subsystems ──────────────────────────────────

    // State store: one handle, shared by the engine for metrics and content.
    let store = tally_state::StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    let options = EngineOptions {
        vocabulary: config.vocabulary()?,
        store_timeout: config.store.timeout(),
    };
    info!(
        metrics = options.vocabulary.len(),
        timeout = ?options.store_timeout,
        "metrics engine initialized"
    );
    let engine = MetricsEngine::new(store.clone(), store, options);

    // ── Start API server ───────────────────────────────────────

    let router = tally_api::build_router(engine);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("Tally daemon stopped");
    Ok(())
}
