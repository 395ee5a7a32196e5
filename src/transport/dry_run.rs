//! Transport that resolves everything and sends nothing.

use super::{Delivery, Resolution, ResolutionTransport, ResolvedHandle};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunTransport;

#[async_trait]
impl ResolutionTransport for DryRunTransport {
    async fn resolve(&self, primary: &str, variants: &[String], _timeout: Duration) -> Resolution {
        let matched = variants.first().map(String::as_str).unwrap_or(primary);
        Resolution::Resolved(ResolvedHandle {
            handle: matched.to_string(),
            matched_variant: matched.to_string(),
        })
    }

    async fn deliver(&self, handle: &ResolvedHandle, message: &str) -> Delivery {
        info!(handle = %handle.handle, chars = message.chars().count(), "[dry-run] would send");
        Delivery::Delivered
    }
}
