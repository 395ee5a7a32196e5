//! Thin async client for the daemon socket.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use super::protocol::{Request, Response};

/// Send one request and wait for its response, bounded by `timeout`.
pub async fn call(
    socket_path: &Path,
    method: &str,
    params: HashMap<String, serde_json::Value>,
    timeout: Duration,
) -> Result<Response> {
    let request = Request::new(method, params);

    let exchange = async {
        let stream = UnixStream::connect(socket_path)
            .await
            .with_context(|| format!("Daemon not reachable at {:?}", socket_path))?;
        let (read_half, mut writer) = stream.into_split();

        writer.write_all(request.to_ndjson_line()?.as_bytes()).await?;
        writer.flush().await?;

        let mut line = String::new();
        BufReader::new(read_half).read_line(&mut line).await?;
        if line.trim().is_empty() {
            return Err(anyhow!("Daemon closed the connection without responding"));
        }
        Response::from_ndjson_line(&line)
    };

    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| anyhow!("Daemon did not respond within {:?}", timeout))?
}

/// `Ok(result)` for an ok response, `Err(message)` otherwise.
pub fn into_result(response: Response) -> Result<serde_json::Value> {
    if response.ok {
        Ok(response.result.unwrap_or(serde_json::Value::Null))
    } else {
        let message = response
            .error
            .map(|e| e.message)
            .unwrap_or_else(|| "unknown".to_string());
        Err(anyhow!(message))
    }
}
