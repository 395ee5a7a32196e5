//! Daemon service - dispatches requests to campaign commands.
//!
//! Holds the one `Campaign` for the process, so a background run started by
//! one client can be watched and stopped by another.
//!
//! CHANGELOG:
//! - 10/18/2026 - Campaign methods replace chat.db readers

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::commands::Campaign;
use crate::contacts::rows_from_json;
use crate::sender::SendEvent;

#[derive(Debug, Error)]
#[error("Unknown method: {0}")]
pub struct UnknownMethod(pub String);

#[derive(Clone)]
pub struct DaemonService {
    campaign: Campaign,
    started_at: String, // ISO timestamp
}

impl DaemonService {
    pub fn new(campaign: Campaign) -> Self {
        Self {
            campaign,
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    /// Dispatch request to appropriate handler.
    pub async fn dispatch(&self, method: &str, params: HashMap<String, Value>) -> Result<Value> {
        match method {
            "health" => self.health(),
            "process_file" => self.process_file(params).await,
            "start_sending" => Ok(json!(self.campaign.start_sending().await)),
            "stop_sending" => Ok(json!(self.campaign.stop_sending())),
            "status" => Ok(json!(self.campaign.status())),
            "history" => self.history(params).await,
            "clear_history" => Ok(json!(self.campaign.clear_history().await)),
            "clear_queue" => Ok(json!(self.campaign.clear_queue().await)),
            "preview" => Ok(json!(self.campaign.preview().await?)),
            _ => Err(UnknownMethod(method.to_string()).into()),
        }
    }

    fn health(&self) -> Result<Value> {
        Ok(json!({
            "pid": std::process::id(),
            "started_at": self.started_at,
            "version": "v1",
            "run_state": self.campaign.status().run_state,
        }))
    }

    /// Params: rows (array of objects) or path (.csv / .json file)
    async fn process_file(&self, mut params: HashMap<String, Value>) -> Result<Value> {
        if let Some(rows) = params.remove("rows") {
            let result = match rows_from_json(rows) {
                Ok(rows) => self.campaign.process_file(&rows).await,
                Err(e) => {
                    self.campaign.orchestrator().emit(SendEvent::error(e.to_string()));
                    crate::commands::CommandResult::fail(e.to_string())
                }
            };
            return Ok(json!(result));
        }

        let path = params
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("process_file requires 'rows' or 'path'"))?;
        let path = crate::config::expand_path(path);
        Ok(json!(self.campaign.process_path(Path::new(&path)).await))
    }

    /// Params: limit (most recent N)
    async fn history(&self, params: HashMap<String, Value>) -> Result<Value> {
        let limit = params
            .get("limit")
            .and_then(Value::as_u64)
            .map(|n| n as usize);
        let entries = self.campaign.history(limit).await?;
        Ok(json!({
            "count": entries.len(),
            "entries": entries,
        }))
    }
}
