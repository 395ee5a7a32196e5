//! iMessage transport: resolve phones against chat.db handles, deliver via
//! AppleScript.
//!
//! CHANGELOG:
//! - 10/18/2026 - Initial implementation

use super::{applescript, chat_db, Delivery, Resolution, ResolutionTransport, ResolvedHandle};
use crate::errors::TransportError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

pub struct IMessageTransport {
    messages_db: PathBuf,
    /// Resolve to the normalized phone when no handle exists yet
    allow_unlisted_handles: bool,
    deliver_timeout: Duration,
}

impl IMessageTransport {
    pub fn new(messages_db: PathBuf, allow_unlisted_handles: bool, deliver_timeout: Duration) -> Self {
        Self {
            messages_db,
            allow_unlisted_handles,
            deliver_timeout,
        }
    }
}

#[async_trait]
impl ResolutionTransport for IMessageTransport {
    async fn ready(&self, timeout: Duration) -> Result<(), TransportError> {
        let db_path = self.messages_db.clone();
        let check = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            chat_db::open_db(&db_path)?;
            applescript::check_messages_app()
        });

        match tokio::time::timeout(timeout, check).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(TransportError::Unavailable(e.to_string())),
            Ok(Err(e)) => Err(TransportError::Unavailable(e.to_string())),
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }

    async fn resolve(&self, primary: &str, variants: &[String], timeout: Duration) -> Resolution {
        let db_path = self.messages_db.clone();
        let candidates = variants.to_vec();
        let lookup = tokio::task::spawn_blocking(move || {
            let conn = chat_db::open_db(&db_path)?;
            chat_db::find_handle(&conn, &candidates)
        });

        match tokio::time::timeout(timeout, lookup).await {
            Ok(Ok(Ok(Some((handle, matched_variant))))) => {
                debug!(phone = primary, handle = %handle, "resolved handle");
                return Resolution::Resolved(ResolvedHandle {
                    handle,
                    matched_variant,
                });
            }
            Ok(Ok(Ok(None))) => {}
            Ok(Ok(Err(e))) => warn!(phone = primary, error = %e, "handle lookup failed"),
            Ok(Err(e)) => warn!(phone = primary, error = %e, "handle lookup task failed"),
            Err(_) => warn!(phone = primary, ?timeout, "handle lookup timed out"),
        }

        if self.allow_unlisted_handles {
            let normalized = crate::contacts::phone::normalize(primary);
            debug!(phone = primary, "no existing handle, sending to normalized phone");
            return Resolution::Resolved(ResolvedHandle {
                handle: normalized.clone(),
                matched_variant: normalized,
            });
        }

        Resolution::NotFound
    }

    async fn deliver(&self, handle: &ResolvedHandle, message: &str) -> Delivery {
        match applescript::send_imessage_with_timeout(&handle.handle, message, self.deliver_timeout)
            .await
        {
            Ok(()) => Delivery::Delivered,
            Err(e) => Delivery::Failed(e.to_string()),
        }
    }
}
