//! wolfies-blitz-daemon - Long-lived campaign runner behind a UNIX socket.
//!
//! CHANGELOG:
//! - 10/18/2026 - Shutdown waits for the in-flight message; stop waits for exit
//! - 10/18/2026 - Tokio runtime built after daemonizing
//! - 01/10/2026 - Initial implementation

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use tracing::{info, warn};

use wolfies_blitz::commands;
use wolfies_blitz::config::{self, Config};
use wolfies_blitz::daemon::pidfile::{self, pid_file_for};
use wolfies_blitz::daemon::{server::DaemonServer, service::DaemonService};

#[derive(Parser)]
#[command(name = "wolfies-blitz-daemon")]
#[command(about = "Persistent daemon for wolfies-blitz campaigns")]
struct Cli {
    /// Config file (default: ~/.wolfies-blitz/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Socket path (overrides config)
    #[arg(long, global = true)]
    socket: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon
    Start {
        /// Run in foreground (don't daemonize)
        #[arg(long)]
        foreground: bool,

        /// Log messages instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Stop the daemon
    Stop,

    /// Check daemon status
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::load(config::expand_path(path)),
        None => Config::load_default(),
    }
    .context("Failed to load config")?;
    let socket_path = match cli.socket {
        Some(ref socket) => config::expand_path(socket),
        None => config.paths.socket_path(),
    };

    match cli.command {
        Commands::Start { foreground, dry_run } => cmd_start(&config, &socket_path, foreground, dry_run),
        Commands::Stop => cmd_stop(&config, &socket_path),
        Commands::Status => cmd_status(&socket_path),
    }
}

fn cmd_start(config: &Config, socket_path: &Path, foreground: bool, dry_run: bool) -> Result<()> {
    // One daemon per socket, including one that is still shutting down
    if let Ok(pid) = pidfile::read_pid(&pid_file_for(socket_path)) {
        if pidfile::process_alive(pid) {
            anyhow::bail!("Daemon already running (pid {})", pid);
        }
    }
    if std::os::unix::net::UnixStream::connect(socket_path).is_ok() {
        anyhow::bail!("Daemon already listening at {}", socket_path.display());
    }

    // Create parent directory if needed
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !foreground {
        // Fork before any runtime threads exist
        use daemonize::Daemonize;

        let daemonize = Daemonize::new()
            .pid_file(pid_file_for(socket_path))
            .working_directory("/tmp");

        if let Err(e) = daemonize.start() {
            eprintln!("Failed to daemonize: {}", e);
            std::process::exit(1);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let campaign = commands::build_campaign(config, dry_run)?;
        let service = DaemonService::new(campaign);
        let server = DaemonServer::new(service, socket_path);

        info!(dry_run, "daemon starting");
        // Returns once the message in flight has settled; the rest stays queued
        server.serve(shutdown_signal()).await?;
        if !foreground {
            let _ = std::fs::remove_file(pid_file_for(socket_path));
        }
        info!("daemon stopped");
        anyhow::Ok(())
    })
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = term.recv() => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

fn cmd_stop(config: &Config, socket_path: &Path) -> Result<()> {
    let pid_file = pid_file_for(socket_path);
    let pid = pidfile::read_pid(&pid_file)?;

    if pidfile::process_alive(pid) {
        // Send SIGTERM
        unsafe {
            libc::kill(pid, libc::SIGTERM);
        }

        let timeout = config.pacing.settle_timeout();
        if !pidfile::wait_for_exit(pid, timeout) {
            anyhow::bail!(
                "Daemon (pid {}) still finishing after {:?}; run stop again to keep waiting",
                pid,
                timeout
            );
        }
    }

    // The daemon removes its own socket; only the pid file is left
    let _ = std::fs::remove_file(&pid_file);

    println!("Daemon stopped (pid {})", pid);

    Ok(())
}

fn cmd_status(socket_path: &Path) -> Result<()> {
    match std::os::unix::net::UnixStream::connect(socket_path) {
        Ok(_) => {
            println!("Daemon running at {}", socket_path.display());
            Ok(())
        }
        Err(_) => {
            println!("Daemon not running");
            std::process::exit(1);
        }
    }
}
