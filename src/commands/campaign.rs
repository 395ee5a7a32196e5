//! Campaign commands: process-file, start, stop, and the housekeeping
//! commands around them.
//!
//! Every command answers with a `CommandResult` so the CLI, the daemon and
//! any UI render the same `{success, message}` shape.
//!
//! CHANGELOG:
//! - 10/18/2026 - Initial implementation

use crate::contacts::{self, decoder_for_path, Contact, Row};
use crate::errors::{SendError, StoreError};
use crate::history::HistoryEntry;
use crate::sender::{Pacing, QueueStatus, SendEvent, SendOrchestrator, StartOutcome};
use crate::store::{self, PersistenceStore};
use crate::template;
use crate::transport::ResolutionTransport;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contacts: Option<Vec<Contact>>,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            contacts: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            contacts: None,
        }
    }
}

/// What a queued contact's message will look like once sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagePreview {
    pub row_number: usize,
    pub phone: String,
    pub name: String,
    pub message: String,
    /// Placeholders that will be sent verbatim
    pub unresolved: Vec<String>,
    pub phone_valid: bool,
}

/// Command handler over one store and one orchestrator.
#[derive(Clone)]
pub struct Campaign {
    store: Arc<dyn PersistenceStore>,
    orchestrator: SendOrchestrator,
}

impl Campaign {
    pub fn new(
        store: Arc<dyn PersistenceStore>,
        transport: Arc<dyn ResolutionTransport>,
        pacing: Pacing,
    ) -> Self {
        let orchestrator = SendOrchestrator::new(transport, store.clone(), pacing);
        Self { store, orchestrator }
    }

    pub fn orchestrator(&self) -> &SendOrchestrator {
        &self.orchestrator
    }

    // ========================================================================
    // ProcessFile
    // ========================================================================

    /// Ingest rows and replace the persisted queue.
    ///
    /// On a validation error nothing is persisted and an error notification
    /// is emitted.
    pub async fn process_file(&self, rows: &[Row]) -> CommandResult {
        if self.orchestrator.is_running() {
            return CommandResult::fail("Cannot load a new file while sending is in progress");
        }

        let contacts = match contacts::ingest(rows) {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!(error = %e, "ingestion failed");
                self.orchestrator.emit(SendEvent::error(e.to_string()));
                return CommandResult::fail(e.to_string());
            }
        };

        if let Err(e) = store::save_queue(self.store.as_ref(), &contacts).await {
            return CommandResult::fail(format!("Failed to save contacts: {}", e));
        }

        let flagged = contacts.iter().filter(|c| !c.phone_valid).count();
        let mut message = format!("Processed {} contacts successfully", contacts.len());
        if flagged > 0 {
            message.push_str(&format!(" ({} with invalid-looking phone numbers)", flagged));
        }
        info!(count = contacts.len(), flagged, "queue replaced");

        CommandResult {
            success: true,
            message,
            contacts: Some(contacts),
        }
    }

    /// Decode a file by extension, then `process_file`.
    pub async fn process_path(&self, path: &Path) -> CommandResult {
        let decoder = match decoder_for_path(path) {
            Ok(decoder) => decoder,
            Err(e) => return CommandResult::fail(e.to_string()),
        };
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => return CommandResult::fail(format!("Failed to read {:?}: {}", path, e)),
        };
        match decoder.decode(&bytes) {
            Ok(rows) => self.process_file(&rows).await,
            Err(e) => {
                self.orchestrator.emit(SendEvent::error(e.to_string()));
                CommandResult::fail(e.to_string())
            }
        }
    }

    // ========================================================================
    // StartSending / StopSending
    // ========================================================================

    /// Start sending the persisted queue in the background.
    ///
    /// Replies once the transport readiness check has passed, so a start
    /// that cannot run reports failure here as well as through events.
    pub async fn start_sending(&self) -> CommandResult {
        if self.orchestrator.is_running() {
            return CommandResult::fail("Sending already in progress");
        }

        let contacts = match self.queued().await {
            Ok(contacts) => contacts,
            Err(result) => return result,
        };
        let count = contacts.len();

        let run = match self.orchestrator.launch(contacts).await {
            Ok(Some(run)) => run,
            Ok(None) => return CommandResult::fail("Sending already in progress"),
            Err(e) => return CommandResult::fail(e.to_string()),
        };

        tokio::spawn(async move {
            let summary = run.run().await;
            info!(?summary, "background campaign finished");
        });

        CommandResult::ok(format!("Sending started for {} contacts", count))
    }

    /// Send the persisted queue and wait for the run to end.
    pub async fn send_to_completion(&self) -> CommandResult {
        let contacts = match self.queued().await {
            Ok(contacts) => contacts,
            Err(result) => return result,
        };

        match self.orchestrator.start(contacts).await {
            Ok(StartOutcome::Finished(summary)) if summary.stopped => CommandResult::ok(format!(
                "Stopped: {} sent, {} failed, {} left in queue",
                summary.sent, summary.failed, summary.remaining
            )),
            Ok(StartOutcome::Finished(summary)) => CommandResult::ok(format!(
                "Done: {} sent, {} failed",
                summary.sent, summary.failed
            )),
            Ok(StartOutcome::AlreadyRunning) => CommandResult::fail("Sending already in progress"),
            Err(e) => CommandResult::fail(e.to_string()),
        }
    }

    pub fn stop_sending(&self) -> CommandResult {
        if self.orchestrator.stop() {
            CommandResult::ok("Stopping after the current message")
        } else {
            CommandResult::fail("Nothing is being sent")
        }
    }

    async fn queued(&self) -> Result<Vec<Contact>, CommandResult> {
        match store::load_queue(self.store.as_ref()).await {
            Ok(contacts) if contacts.is_empty() => {
                Err(CommandResult::fail(SendError::EmptyQueue.to_string()))
            }
            Ok(contacts) => Ok(contacts),
            Err(e) => Err(CommandResult::fail(format!("Failed to load queue: {}", e))),
        }
    }

    // ========================================================================
    // Status, history, housekeeping
    // ========================================================================

    pub fn status(&self) -> QueueStatus {
        self.orchestrator.status()
    }

    /// History entries, newest last; `limit` keeps only the most recent.
    pub async fn history(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut entries = self.orchestrator.history().all().await?;
        if let Some(limit) = limit {
            let skip = entries.len().saturating_sub(limit);
            entries.drain(..skip);
        }
        Ok(entries)
    }

    pub async fn clear_history(&self) -> CommandResult {
        if self.orchestrator.is_running() {
            return CommandResult::fail("Cannot clear history while sending is in progress");
        }
        match self.orchestrator.history().clear().await {
            Ok(()) => CommandResult::ok("History cleared"),
            Err(e) => CommandResult::fail(format!("Failed to clear history: {}", e)),
        }
    }

    pub async fn clear_queue(&self) -> CommandResult {
        if self.orchestrator.is_running() {
            return CommandResult::fail("Cannot clear contacts while sending is in progress");
        }
        match store::save_queue(self.store.as_ref(), &[]).await {
            Ok(()) => CommandResult::ok("Contacts cleared"),
            Err(e) => CommandResult::fail(format!("Failed to clear contacts: {}", e)),
        }
    }

    /// Expand every queued message without sending.
    pub async fn preview(&self) -> Result<Vec<MessagePreview>, StoreError> {
        let contacts = store::load_queue(self.store.as_ref()).await?;
        Ok(contacts
            .into_iter()
            .map(|contact| {
                let fields = contact.template_fields();
                MessagePreview {
                    row_number: contact.row_number,
                    message: template::expand(&contact.message, &fields),
                    unresolved: template::unresolved(&contact.message, &fields),
                    phone_valid: contact.phone_valid,
                    phone: contact.phone,
                    name: contact.name,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::RunState;
    use crate::store::MemoryStore;
    use crate::transport::DryRunTransport;

    fn campaign() -> Campaign {
        Campaign::new(
            Arc::new(MemoryStore::new()),
            Arc::new(DryRunTransport),
            Pacing::immediate(),
        )
    }

    fn rows(csv: &str) -> Vec<Row> {
        use crate::contacts::{CsvDecoder, TabularDecoder};
        CsvDecoder.decode(csv.as_bytes()).unwrap()
    }

    const CSV: &str = "phone,name,message,city\n\
                       +15551234567,Ann,Hi {{name}} from {{city}},Rome\n\
                       +15557654321,Bob,Hi {{name}} from {{city}},\n";

    #[tokio::test]
    async fn test_process_file_persists_queue() {
        let campaign = campaign();
        let result = campaign.process_file(&rows(CSV)).await;
        assert!(result.success, "{}", result.message);
        assert_eq!(result.message, "Processed 2 contacts successfully");
        assert_eq!(result.contacts.as_ref().map(Vec::len), Some(2));

        let preview = campaign.preview().await.unwrap();
        assert_eq!(preview[0].message, "Hi Ann from Rome");
        assert_eq!(preview[1].message, "Hi Bob from {{city}}");
        assert_eq!(preview[1].unresolved, vec!["city".to_string()]);
    }

    #[tokio::test]
    async fn test_process_file_error_keeps_previous_queue() {
        let campaign = campaign();
        campaign.process_file(&rows(CSV)).await;
        let mut rx = campaign.orchestrator().subscribe();

        let result = campaign
            .process_file(&rows("phone,name\n+15551234567,Ann\n"))
            .await;
        assert!(!result.success);
        assert_eq!(result.message, "Missing required columns: message");
        assert_eq!(campaign.preview().await.unwrap().len(), 2);
        assert_eq!(
            rx.try_recv().unwrap(),
            SendEvent::error("Missing required columns: message")
        );
    }

    #[tokio::test]
    async fn test_start_without_queue_fails() {
        let result = campaign().start_sending().await;
        assert!(!result.success);
        assert!(result.message.starts_with("No contacts queued"));
    }

    #[tokio::test]
    async fn test_send_to_completion_drains_queue_and_records_history() {
        let campaign = campaign();
        campaign.process_file(&rows(CSV)).await;

        let result = campaign.send_to_completion().await;
        assert!(result.success);
        assert_eq!(result.message, "Done: 2 sent, 0 failed");

        assert_eq!(campaign.status().run_state, RunState::Idle);
        assert_eq!(campaign.status().progress_percent, 100);
        assert!(campaign.preview().await.unwrap().is_empty());
        assert_eq!(campaign.history(None).await.unwrap().len(), 2);
        assert_eq!(campaign.history(Some(1)).await.unwrap()[0].name, "Bob");
    }

    #[tokio::test]
    async fn test_background_start_reports_through_events() {
        let campaign = campaign();
        campaign.process_file(&rows(CSV)).await;
        let mut rx = campaign.orchestrator().subscribe();

        let result = campaign.start_sending().await;
        assert!(result.success);
        assert_eq!(result.message, "Sending started for 2 contacts");

        loop {
            match rx.recv().await.unwrap() {
                SendEvent::Notification { .. } => break,
                SendEvent::Progress { .. } => continue,
            }
        }
        assert_eq!(campaign.history(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_starts_report_one_success() {
        let campaign = campaign();
        campaign.process_file(&rows(CSV)).await;

        let (first, second) = tokio::join!(campaign.start_sending(), campaign.start_sending());
        let successes = [&first, &second].iter().filter(|r| r.success).count();
        assert_eq!(successes, 1, "{:?} / {:?}", first, second);

        campaign.orchestrator().wait_idle().await;
        assert_eq!(campaign.history(None).await.unwrap().len(), 2);
    }

    struct UnreadyTransport;

    #[async_trait::async_trait]
    impl ResolutionTransport for UnreadyTransport {
        async fn ready(&self, _timeout: std::time::Duration) -> Result<(), crate::errors::TransportError> {
            Err(crate::errors::TransportError::Unavailable("Messages.app is not running".into()))
        }

        async fn resolve(
            &self,
            _primary: &str,
            _variants: &[String],
            _timeout: std::time::Duration,
        ) -> crate::transport::Resolution {
            crate::transport::Resolution::NotFound
        }

        async fn deliver(&self, _handle: &crate::transport::ResolvedHandle, _message: &str) -> crate::transport::Delivery {
            crate::transport::Delivery::Failed("unreachable".into())
        }
    }

    #[tokio::test]
    async fn test_start_reports_unready_transport() {
        let campaign = Campaign::new(
            Arc::new(MemoryStore::new()),
            Arc::new(UnreadyTransport),
            Pacing::immediate(),
        );
        campaign.process_file(&rows(CSV)).await;

        let result = campaign.start_sending().await;
        assert!(!result.success);
        assert_eq!(result.message, "Messaging surface unavailable: Messages.app is not running");
        assert!(!campaign.orchestrator().is_running());
        assert_eq!(campaign.preview().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stop_when_idle() {
        assert!(!campaign().stop_sending().success);
    }

    #[tokio::test]
    async fn test_clear_commands() {
        let campaign = campaign();
        campaign.process_file(&rows(CSV)).await;
        campaign.send_to_completion().await;
        campaign.process_file(&rows(CSV)).await;

        assert!(campaign.clear_queue().await.success);
        assert!(campaign.preview().await.unwrap().is_empty());
        assert!(campaign.clear_history().await.success);
        assert!(campaign.history(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_process_path_loads_spreadsheet() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/contacts.xlsx");
        let campaign = campaign();
        let result = campaign.process_path(&path).await;
        assert!(result.success, "{}", result.message);

        let preview = campaign.preview().await.unwrap();
        assert_eq!(preview[0].message, "Hi Ann from Rome");
        assert_eq!(preview[1].unresolved, vec!["city".to_string()]);
    }

    #[tokio::test]
    async fn test_process_path_rejects_unknown_extension() {
        let result = campaign().process_path(Path::new("contacts.txt")).await;
        assert!(!result.success);
        assert!(result.message.starts_with("Invalid file extension: .txt"));
    }
}
