//! UNIX socket server for daemon mode.
//!
//! Listens on a UNIX socket, accepts connections, and dispatches requests
//! to DaemonService. Each connection gets its own task so a long
//! `process_file` never blocks a `stop_sending`.
//!
//! CHANGELOG:
//! - 10/18/2026 - Shutdown stops the campaign and waits for the current message
//! - 10/18/2026 - Async accept loop on tokio

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{info, warn};

use crate::daemon::{protocol, service::DaemonService};

pub struct DaemonServer {
    service: DaemonService,
    socket_path: PathBuf,
}

impl DaemonServer {
    pub fn new(service: DaemonService, socket_path: impl AsRef<Path>) -> Self {
        Self {
            service,
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    /// Bind the socket and serve until `shutdown` resolves.
    ///
    /// On shutdown the campaign is stopped and the message in flight is
    /// allowed to finish before the socket goes away. Unsent contacts stay
    /// in the persisted queue.
    pub async fn serve(&self, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
        // Clean up stale socket
        let _ = std::fs::remove_file(&self.socket_path);
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind {:?}", self.socket_path))?;

        // Owner-only (0600)
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        info!(socket = ?self.socket_path, "daemon listening");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let service = self.service.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(&service, stream).await {
                                warn!(error = %e, "connection error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "accept error"),
                },
                _ = &mut shutdown => {
                    info!("daemon shutting down");
                    break;
                }
            }
        }

        drop(listener);
        let campaign = self.service.campaign();
        if campaign.stop_sending().success {
            warn!("campaign stopped by shutdown");
        }
        info!("waiting for the current message to settle");
        campaign.orchestrator().wait_idle().await;

        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }
}

async fn handle_connection(service: &DaemonService, stream: UnixStream) -> Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut line = String::new();
    reader.read_line(&mut line).await?;
    if line.trim().is_empty() {
        return Ok(()); // Client disconnected
    }

    let start = Instant::now();
    let elapsed_ms = |start: Instant| start.elapsed().as_secs_f64() * 1000.0;

    let response = match protocol::Request::from_ndjson_line(&line) {
        Ok(request) => {
            info!(method = %request.method, id = %request.id, "request");
            match service.dispatch(&request.method, request.params).await {
                Ok(result) => protocol::Response::success(request.id, result, elapsed_ms(start)),
                Err(e) => {
                    let code = if e.downcast_ref::<super::service::UnknownMethod>().is_some() {
                        "UNKNOWN_METHOD"
                    } else {
                        "ERROR"
                    };
                    protocol::Response::error(request.id, code, e.to_string(), elapsed_ms(start))
                }
            }
        }
        Err(e) => protocol::Response::error(
            String::new(),
            "BAD_REQUEST",
            format!("{:#}", e),
            elapsed_ms(start),
        ),
    };

    writer.write_all(response.to_ndjson_line()?.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Campaign;
    use crate::daemon::client::call;
    use crate::sender::Pacing;
    use crate::store::MemoryStore;
    use crate::transport::{
        Delivery, DryRunTransport, Resolution, ResolutionTransport, ResolvedHandle,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    async fn wait_for_bind(socket: &Path) {
        for _ in 0..50 {
            if socket.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_round_trip_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("blitz.sock");

        let campaign = Campaign::new(
            Arc::new(MemoryStore::new()),
            Arc::new(DryRunTransport),
            Pacing::immediate(),
        );
        let server = DaemonServer::new(DaemonService::new(campaign), &socket);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .serve(async {
                    let _ = rx.await;
                })
                .await
        });

        wait_for_bind(&socket).await;

        let resp = call(&socket, "health", HashMap::new(), Duration::from_secs(2))
            .await
            .unwrap();
        assert!(resp.ok);
        assert_eq!(resp.result.unwrap()["version"], "v1");

        let resp = call(&socket, "bogus", HashMap::new(), Duration::from_secs(2))
            .await
            .unwrap();
        assert!(!resp.ok);
        assert_eq!(resp.error.unwrap().code, "UNKNOWN_METHOD");

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
        assert!(!socket.exists());
    }

    /// Signals when a delivery starts, then takes a while to finish it.
    struct SlowTransport {
        delivering: Arc<Notify>,
    }

    #[async_trait]
    impl ResolutionTransport for SlowTransport {
        async fn resolve(&self, primary: &str, _variants: &[String], _timeout: Duration) -> Resolution {
            Resolution::Resolved(ResolvedHandle {
                handle: primary.to_string(),
                matched_variant: primary.to_string(),
            })
        }

        async fn deliver(&self, _handle: &ResolvedHandle, _message: &str) -> Delivery {
            self.delivering.notify_one();
            tokio::time::sleep(Duration::from_millis(200)).await;
            Delivery::Delivered
        }
    }

    #[tokio::test]
    async fn test_shutdown_lets_current_message_finish() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("blitz.sock");
        let delivering = Arc::new(Notify::new());

        let campaign = Campaign::new(
            Arc::new(MemoryStore::new()),
            Arc::new(SlowTransport {
                delivering: delivering.clone(),
            }),
            Pacing::immediate(),
        );
        let service = DaemonService::new(campaign.clone());
        let rows = json!([
            {"phone": "+15551234567", "name": "Ann", "message": "a"},
            {"phone": "+15557654321", "name": "Bob", "message": "b"}
        ]);
        let loaded = service
            .dispatch("process_file", HashMap::from([("rows".to_string(), rows)]))
            .await
            .unwrap();
        assert_eq!(loaded["success"], true);

        let server = DaemonServer::new(service, &socket);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .serve(async {
                    let _ = rx.await;
                })
                .await
        });
        wait_for_bind(&socket).await;

        let resp = call(&socket, "start_sending", HashMap::new(), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(resp.result.unwrap()["success"], true);
        delivering.notified().await;

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();

        // Ann finished before the server returned; Bob is still queued
        assert!(!campaign.orchestrator().is_running());
        let history = campaign.history(None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].name, "Ann");
        let queued = campaign.preview().await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].name, "Bob");
        assert!(!socket.exists());
    }
}
