//! wolfies-blitz - bulk personalized iMessage sender
//!
//! Local commands work directly on the store; start/stop/status talk to
//! the daemon so a campaign can run in the background.
//!
//! CHANGELOG:
//! - 10/18/2026 - Campaign CLI
//! - 01/10/2026 - Initial scaffold with CLI skeleton

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use wolfies_blitz::commands::{self, Campaign};
use wolfies_blitz::config::{self, Config};
use wolfies_blitz::daemon::client;
use wolfies_blitz::history::HistoryStatus;
use wolfies_blitz::output::{self, OutputControls};

const DAEMON_TIMEOUT: Duration = Duration::from_secs(5);

/// Bulk personalized iMessage sender - paced, resumable, audited.
#[derive(Parser, Debug)]
#[command(name = "wolfies-blitz")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Compact JSON output (no whitespace)
    #[arg(long, global = true)]
    compact: bool,

    /// Comma-separated field allowlist
    #[arg(long, global = true)]
    fields: Option<String>,

    /// Truncate text fields to this length
    #[arg(long, global = true)]
    max_text_chars: Option<usize>,

    /// Config file (default: ~/.wolfies-blitz/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    // =========================================================================
    // QUEUE COMMANDS
    // =========================================================================
    /// Load a .csv, .json or .xlsx contact file into the send queue
    Process {
        /// Contact file with phone, name and message columns
        file: PathBuf,
    },

    /// Show every queued message as it will be sent
    Preview,

    /// Drop the queued contacts
    Clear,

    // =========================================================================
    // SENDING COMMANDS
    // =========================================================================
    /// Send the queue in the foreground (Ctrl-C stops after the current message)
    Send {
        /// Log messages instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Start sending in the daemon
    Start,

    /// Stop the daemon's current campaign
    Stop,

    /// Daemon campaign status
    Status,

    // =========================================================================
    // HISTORY COMMANDS
    // =========================================================================
    /// Show the send history
    History {
        /// Only the most recent N entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete the send history
    ClearHistory,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let output_controls = OutputControls {
        json: cli.json,
        compact: cli.compact,
        fields: cli.fields.clone(),
        max_text_chars: cli.max_text_chars,
    };

    match run(cli, &output_controls).await {
        Ok(true) => ExitCode::from(0),
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            if output_controls.json {
                println!("{}", output::format_error(&format!("{:#}", e)));
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli, output: &OutputControls) -> Result<bool> {
    let config = match cli.config {
        Some(ref path) => Config::load(config::expand_path(path)),
        None => Config::load_default(),
    }
    .context("Failed to load config")?;

    match cli.command {
        Command::Process { file } => {
            let campaign = commands::build_campaign(&config, false)?;
            process(&campaign, &file, output).await
        }
        Command::Preview => {
            let campaign = commands::build_campaign(&config, false)?;
            preview(&campaign, output).await
        }
        Command::Clear => {
            let campaign = commands::build_campaign(&config, false)?;
            Ok(output.print_result(&campaign.clear_queue().await))
        }
        Command::Send { dry_run } => {
            let campaign = commands::build_campaign(&config, dry_run)?;
            send(&campaign, output).await
        }
        Command::Start => daemon_command(&config, "start_sending", output).await,
        Command::Stop => daemon_command(&config, "stop_sending", output).await,
        Command::Status => status(&config, output).await,
        Command::History { limit } => {
            let campaign = commands::build_campaign(&config, false)?;
            history(&campaign, limit, output).await
        }
        Command::ClearHistory => {
            let campaign = commands::build_campaign(&config, false)?;
            Ok(output.print_result(&campaign.clear_history().await))
        }
    }
}

async fn process(campaign: &Campaign, file: &std::path::Path, output: &OutputControls) -> Result<bool> {
    let result = campaign.process_path(file).await;
    if output.json {
        output.print(&result);
        return Ok(result.success);
    }

    let ok = output.print_result(&result);
    for contact in result.contacts.iter().flatten().filter(|c| !c.phone_valid) {
        println!(
            "  row {}: {} ({}) does not look like a valid phone number",
            contact.row_number, contact.phone, contact.name
        );
    }
    Ok(ok)
}

async fn preview(campaign: &Campaign, output: &OutputControls) -> Result<bool> {
    let previews = campaign.preview().await?;
    if output.json {
        output.print(&previews);
        return Ok(true);
    }

    if previews.is_empty() {
        println!("Queue is empty");
    }
    for p in &previews {
        println!("row {:<4} {} ({}): {}", p.row_number, p.phone, p.name, p.message);
        if !p.unresolved.is_empty() {
            println!("         unresolved placeholders: {}", p.unresolved.join(", "));
        }
    }
    Ok(true)
}

/// Foreground run: print events as they arrive, Ctrl-C requests a stop.
async fn send(campaign: &Campaign, output: &OutputControls) -> Result<bool> {
    let mut events = campaign.orchestrator().subscribe();
    let run = campaign.send_to_completion();
    tokio::pin!(run);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stopping = false;

    let result = loop {
        tokio::select! {
            result = &mut run => break result,
            Ok(event) = events.recv() => output.print_event(&event),
            _ = &mut ctrl_c, if !stopping => {
                stopping = true;
                campaign.stop_sending();
            }
        }
    };

    while let Ok(event) = events.try_recv() {
        output.print_event(&event);
    }
    Ok(output.print_result(&result))
}

async fn history(campaign: &Campaign, limit: Option<usize>, output: &OutputControls) -> Result<bool> {
    let entries = campaign.history(limit).await?;
    if output.json {
        output.print(&entries);
        return Ok(true);
    }

    if entries.is_empty() {
        println!("No history");
    }
    for entry in &entries {
        let status = match entry.status {
            HistoryStatus::Success => "sent",
            HistoryStatus::Error => "FAILED",
        };
        print!("{}  {:<6}  {} ({})", entry.timestamp, status, entry.phone, entry.name);
        match entry.error {
            Some(ref error) => println!("  {}", error),
            None => println!(),
        }
    }
    Ok(true)
}

// =============================================================================
// DAEMON-BACKED COMMANDS
// =============================================================================

async fn call_daemon(config: &Config, method: &str) -> Result<Value> {
    let response = client::call(
        &config.paths.socket_path(),
        method,
        HashMap::new(),
        // start_sending replies after the transport readiness check
        DAEMON_TIMEOUT + Duration::from_millis(config.pacing.ready_timeout_ms),
    )
    .await
    .context("Is the daemon running? Start it with `wolfies-blitz-daemon start`")?;
    client::into_result(response)
}

async fn daemon_command(config: &Config, method: &str, output: &OutputControls) -> Result<bool> {
    let result: commands::CommandResult = serde_json::from_value(call_daemon(config, method).await?)?;
    Ok(output.print_result(&result))
}

async fn status(config: &Config, output: &OutputControls) -> Result<bool> {
    let status = call_daemon(config, "status").await?;
    if output.json {
        output.print(&status);
        return Ok(true);
    }

    let total = status["total"].as_u64().unwrap_or(0);
    let remaining = status["remaining"].as_u64().unwrap_or(0);
    println!(
        "{}  {}%  ({}/{} dispatched)",
        status["run_state"].as_str().unwrap_or("unknown"),
        status["progress_percent"],
        total.saturating_sub(remaining),
        total
    );
    Ok(true)
}
