//! vigild — the Vigil daemon.
//!
//! Single binary that assembles the monitoring service:
//! - Record store (redb)
//! - Probe executor
//! - Drift-corrected cycle scheduler
//! - REST API
//!
//! # Usage
//!
//! ```text
//! vigild serve --port 5000 --data-dir /var/lib/vigil --probe-interval 300
//! ```

mod seed;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

#[derive(Parser)]
#[command(name = "vigild", about = "Vigil monitoring daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the API server and the periodic probe scheduler.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "5000")]
        port: u16,

        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/vigil")]
        data_dir: PathBuf,

        /// Seconds between periodic probe cycles.
        #[arg(long, default_value = "300")]
        probe_interval: u64,

        /// Per-probe timeout in seconds.
        #[arg(long, default_value = "10")]
        probe_timeout: u64,

        /// Seed four demo apps when the store is empty.
        #[arg(long)]
        seed_demo: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vigild=debug,vigil=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            data_dir,
            probe_interval,
            probe_timeout,
            seed_demo,
        } => run_serve(port, data_dir, probe_interval, probe_timeout, seed_demo).await,
    }
}

async fn run_serve(
    port: u16,
    data_dir: PathBuf,
    probe_interval: u64,
    probe_timeout: u64,
    seed_demo: bool,
) -> anyhow::Result<()> {
    info!("Vigil daemon starting");

    // Ensure data directory exists.
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("vigil.redb");

    // ── Initialize subsystems ──────────────────────────────────

    // Record store.
    let store = vigil_state::StateStore::open(&db_path)?;
    info!(path = ?db_path, "record store opened");

    if seed_demo && seed::seed_if_empty(&store)? {
        info!("store was empty, demo apps registered");
    }

    // Probe executor.
    let prober = vigil_probe::Prober::new(Duration::from_secs(probe_timeout))?;
    info!(timeout = probe_timeout, "probe executor initialized");

    // Cycle runner + scheduler.
    let runner = vigil_scheduler::CycleRunner::new(store.clone(), prober);
    let scheduler = vigil_scheduler::CycleScheduler::new(
        runner.clone(),
        Duration::from_secs(probe_interval),
    );
    info!(interval = probe_interval, "cycle scheduler initialized");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background scheduler ─────────────────────────────

    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(shutdown_rx).await;
    });

    // ── Start API server ───────────────────────────────────────

    let router = vigil_api::build_router(store, runner);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Wait for the scheduler to wind down.
    let _ = scheduler_handle.await;

    info!("Vigil daemon stopped");
    Ok(())
}
