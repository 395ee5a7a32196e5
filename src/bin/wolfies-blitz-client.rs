//! wolfies-blitz-client - Thin client for daemon mode.
//!
//! CHANGELOG:
//! - 10/18/2026 - Async client over the shared protocol types
//! - 01/10/2026 - Initial implementation

use anyhow::Result;
use clap::Parser;
use std::collections::HashMap;
use std::time::Duration;

use wolfies_blitz::config::expand_path;
use wolfies_blitz::daemon::client;

#[derive(Parser)]
#[command(name = "wolfies-blitz-client")]
#[command(about = "Thin client for wolfies-blitz daemon")]
struct Cli {
    /// Method to call (health, process_file, start_sending, stop_sending,
    /// status, history, clear_history, clear_queue, preview)
    method: String,

    /// Socket path
    #[arg(long, default_value = "~/.wolfies-blitz/daemon.sock")]
    socket: String,

    /// JSON parameters (as string)
    #[arg(long)]
    params: Option<String>,

    /// Request timeout (seconds)
    #[arg(long, default_value = "5.0")]
    timeout: f64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let params: HashMap<String, serde_json::Value> = match cli.params {
        Some(p) => serde_json::from_str(&p)?,
        None => HashMap::new(),
    };

    let response = client::call(
        &expand_path(&cli.socket),
        &cli.method,
        params,
        Duration::from_secs_f64(cli.timeout),
    )
    .await?;

    match client::into_result(response) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
