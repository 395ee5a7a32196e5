//! Resolution transport: find a contact on the messaging surface and
//! deliver text to it.
//!
//! The orchestrator only sees this trait. All surface-specific guessing
//! (which handle format Messages stored, how to drive AppleScript) lives in
//! the implementations.
//!
//! CHANGELOG:
//! - 10/18/2026 - Initial trait with iMessage and dry-run transports

pub mod applescript;
pub mod chat_db;
pub mod dry_run;
pub mod imessage;

pub use dry_run::DryRunTransport;
pub use imessage::IMessageTransport;

use crate::errors::TransportError;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// The conversation target a phone resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedHandle {
    /// Identifier as the surface knows it (e.g. `+393331234567`)
    pub handle: String,
    /// Which candidate matched
    pub matched_variant: String,
}

/// Outcome of `resolve`. `NotFound` is an ordinary result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedHandle),
    NotFound,
}

/// Outcome of `deliver`. `Failed` is an ordinary result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed(String),
}

#[async_trait]
pub trait ResolutionTransport: Send + Sync {
    /// Check the surface is usable before a run starts.
    async fn ready(&self, _timeout: Duration) -> Result<(), TransportError> {
        Ok(())
    }

    /// Locate the conversation for `primary`, trying `variants` in order.
    async fn resolve(&self, primary: &str, variants: &[String], timeout: Duration) -> Resolution;

    /// Submit `message` to a resolved conversation.
    async fn deliver(&self, handle: &ResolvedHandle, message: &str) -> Delivery;
}
