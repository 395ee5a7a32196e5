//! Command implementations.
//!
//! CHANGELOG:
//! - 10/18/2026 - Campaign command surface

pub mod campaign;

pub use campaign::{Campaign, CommandResult, MessagePreview};

use crate::config::Config;
use crate::sender::Pacing;
use crate::store::SqliteStore;
use crate::transport::{DryRunTransport, IMessageTransport, ResolutionTransport};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Build a campaign over the configured store and transport.
///
/// `dry_run` swaps in a transport that logs instead of sending.
pub fn build_campaign(config: &Config, dry_run: bool) -> Result<Campaign> {
    let store_path = config.paths.store_path();
    let store = SqliteStore::open(&store_path)
        .with_context(|| format!("Failed to open store at {:?}", store_path))?;

    let pacing = Pacing::from(&config.pacing);
    let transport: Arc<dyn ResolutionTransport> = if dry_run {
        Arc::new(DryRunTransport)
    } else {
        Arc::new(IMessageTransport::new(
            config.paths.messages_db_path(),
            config.transport.allow_unlisted_handles,
            pacing.ready_timeout,
        ))
    };

    Ok(Campaign::new(Arc::new(store), transport, pacing))
}
