//! Daemon protocol types for NDJSON communication over UNIX socket.
//!
//! One request line in, one response line out.
//!
//! CHANGELOG:
//! - 10/18/2026 - Campaign methods, typed error codes

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const PROTOCOL_VERSION: u8 = 1;

/// NDJSON request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique request ID (UUID)
    pub id: String,
    /// Protocol version
    pub v: u8,
    /// Method name (e.g., "health", "start_sending")
    pub method: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub ok: bool,
    pub result: Option<serde_json::Value>,
    pub error: Option<ErrorInfo>,
    pub meta: ResponseMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code ("BAD_REQUEST", "UNKNOWN_METHOD", "ERROR")
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Server execution time in milliseconds
    pub server_ms: f64,
    pub protocol_v: u8,
}

impl Request {
    pub fn new(method: impl Into<String>, params: HashMap<String, serde_json::Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            v: PROTOCOL_VERSION,
            method: method.into(),
            params,
        }
    }

    /// Parse request from NDJSON line.
    pub fn from_ndjson_line(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim()).context("Failed to parse request JSON")
    }

    pub fn to_ndjson_line(&self) -> Result<String> {
        Ok(format!("{}\n", serde_json::to_string(self)?))
    }
}

impl Response {
    pub fn success(id: String, result: serde_json::Value, server_ms: f64) -> Self {
        Self {
            id,
            ok: true,
            result: Some(result),
            error: None,
            meta: ResponseMeta {
                server_ms,
                protocol_v: PROTOCOL_VERSION,
            },
        }
    }

    pub fn error(id: String, code: &str, message: String, server_ms: f64) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(ErrorInfo {
                code: code.to_string(),
                message,
            }),
            meta: ResponseMeta {
                server_ms,
                protocol_v: PROTOCOL_VERSION,
            },
        }
    }

    pub fn from_ndjson_line(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim()).context("Failed to parse response JSON")
    }

    /// Serialize response to NDJSON line.
    pub fn to_ndjson_line(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}
