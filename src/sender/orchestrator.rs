//! Send orchestrator: drives one campaign, one contact at a time.
//!
//! State machine: `Idle -> Starting -> Running -> Idle`. `stop()` moves a
//! starting or running campaign to `Stopped`; the loop notices at its next
//! iteration boundary. A stop never interrupts an attempt in flight, and a
//! stop during the readiness check means nothing is dequeued at all.
//!
//! The persisted queue always mirrors the undispatched remainder, so a
//! stopped (or crashed) campaign resumes from where it left off.
//!
//! CHANGELOG:
//! - 10/18/2026 - Initial implementation

use super::events::SendEvent;
use super::pacing::Pacing;
use crate::contacts::{phone, Contact, ContactStatus};
use crate::errors::{AttemptError, SendError};
use crate::history::{HistoryEntry, HistoryLog};
use crate::store::{self, PersistenceStore};
use crate::template;
use crate::transport::{Delivery, Resolution, ResolutionTransport};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    /// Run owned, waiting on the transport readiness check
    Starting,
    Running,
    Stopped,
}

/// Working set of the current campaign. Only the dispatch loop pops items.
#[derive(Debug, Default)]
pub struct SendQueue {
    pub items: VecDeque<Contact>,
    pub total: usize,
    pub progress_percent: u8,
    pub run_state: RunState,
}

/// Point-in-time view for UIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub run_state: RunState,
    pub progress_percent: u8,
    pub total: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    /// Contacts left undispatched (non-zero only after a stop)
    pub remaining: usize,
    pub stopped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Another `start` owns the run; this call did nothing.
    AlreadyRunning,
    Finished(RunSummary),
}

/// A campaign that passed its readiness check and owns the run.
///
/// Dropping it without calling `run` settles the state to `Idle` and
/// releases the run; the persisted queue is untouched.
pub struct ReadyRun {
    orchestrator: SendOrchestrator,
    _run: OwnedMutexGuard<()>,
}

impl ReadyRun {
    /// Dispatch until the queue drains or a stop is observed.
    pub async fn run(self) -> RunSummary {
        self.orchestrator.dispatch_loop().await
    }
}

impl Drop for ReadyRun {
    fn drop(&mut self) {
        self.orchestrator.queue().run_state = RunState::Idle;
    }
}

/// Result of sending to one contact, retries included.
struct SendReport {
    attempts: u32,
    result: Result<(), AttemptError>,
}

#[derive(Clone)]
pub struct SendOrchestrator {
    transport: Arc<dyn ResolutionTransport>,
    store: Arc<dyn PersistenceStore>,
    history: HistoryLog,
    pacing: Pacing,
    queue: Arc<Mutex<SendQueue>>,
    run_lock: Arc<tokio::sync::Mutex<()>>,
    events: broadcast::Sender<SendEvent>,
}

impl SendOrchestrator {
    pub fn new(
        transport: Arc<dyn ResolutionTransport>,
        store: Arc<dyn PersistenceStore>,
        pacing: Pacing,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            history: HistoryLog::new(store.clone()),
            store,
            pacing,
            queue: Arc::new(Mutex::new(SendQueue::default())),
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
            events,
        }
    }

    /// Receive progress and notification events.
    pub fn subscribe(&self) -> broadcast::Receiver<SendEvent> {
        self.events.subscribe()
    }

    /// Publish an event to subscribers (ingestion errors come through here too).
    pub fn emit(&self, event: SendEvent) {
        debug!(?event, "event");
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn status(&self) -> QueueStatus {
        let queue = self.queue();
        QueueStatus {
            run_state: queue.run_state,
            progress_percent: queue.progress_percent,
            total: queue.total,
            remaining: queue.items.len(),
        }
    }

    /// True from the moment `start` takes the run until it settles,
    /// readiness check included.
    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
            || matches!(self.queue().run_state, RunState::Starting | RunState::Running)
    }

    /// Run a campaign over `contacts` to completion or stop.
    ///
    /// A second call while a run is active returns `AlreadyRunning`
    /// immediately. If the transport is not ready the run never enters
    /// `Running` and an error notification is emitted.
    pub async fn start(&self, contacts: Vec<Contact>) -> Result<StartOutcome, SendError> {
        match self.launch(contacts).await? {
            Some(run) => Ok(StartOutcome::Finished(run.run().await)),
            None => Ok(StartOutcome::AlreadyRunning),
        }
    }

    /// Take the run and check transport readiness, without dispatching.
    ///
    /// `Ok(None)` means another campaign owns the run. The returned
    /// `ReadyRun` can be moved into a task so callers learn the readiness
    /// outcome before replying.
    pub async fn launch(&self, contacts: Vec<Contact>) -> Result<Option<ReadyRun>, SendError> {
        let Ok(run) = self.run_lock.clone().try_lock_owned() else {
            info!("start ignored: a campaign is already running");
            return Ok(None);
        };

        if contacts.is_empty() {
            return Err(SendError::EmptyQueue);
        }

        self.queue().run_state = RunState::Starting;

        if let Err(e) = self.transport.ready(self.pacing.ready_timeout).await {
            self.queue().run_state = RunState::Idle;
            error!(error = %e, "transport unavailable, campaign not started");
            self.emit(SendEvent::error(e.to_string()));
            return Err(e.into());
        }

        let total = contacts.len();
        {
            let mut queue = self.queue();
            queue.items = contacts.into();
            queue.total = total;
            queue.progress_percent = 0;
            if queue.run_state == RunState::Stopped {
                // The loop exits before dequeuing anything
                info!(total, "stop requested during readiness check");
            } else {
                queue.run_state = RunState::Running;
                info!(total, "campaign started");
            }
        }

        Ok(Some(ReadyRun {
            orchestrator: self.clone(),
            _run: run,
        }))
    }

    /// Ask the campaign to stop after the attempt in flight.
    ///
    /// Returns false when nothing was starting or running.
    pub fn stop(&self) -> bool {
        let mut queue = self.queue();
        if !matches!(queue.run_state, RunState::Starting | RunState::Running) {
            return false;
        }
        queue.run_state = RunState::Stopped;
        info!(remaining = queue.items.len(), "stop requested");
        true
    }

    /// Resolve once no campaign owns the run, in-flight attempt included.
    pub async fn wait_idle(&self) {
        let _idle = self.run_lock.lock().await;
    }

    // ========================================================================
    // Dispatch loop
    // ========================================================================

    async fn dispatch_loop(&self) -> RunSummary {
        let mut sent = 0;
        let mut failed = 0;

        loop {
            let (mut contact, remaining) = {
                let mut queue = self.queue();
                if queue.run_state != RunState::Running {
                    break;
                }
                let Some(contact) = queue.items.pop_front() else {
                    break;
                };
                let remaining: Vec<Contact> = queue.items.iter().cloned().collect();
                (contact, remaining)
            };
            self.persist_queue(&remaining).await;

            let report = self.send_with_retry(&contact).await;
            let entry = match report.result {
                Ok(()) => {
                    sent += 1;
                    contact.status = ContactStatus::Success;
                    info!(row = contact.row_number, phone = %contact.phone, attempts = report.attempts, "message sent");
                    HistoryEntry::success(&contact, report.attempts)
                }
                Err(e) => {
                    failed += 1;
                    contact.status = ContactStatus::Failed;
                    error!(row = contact.row_number, phone = %contact.phone, attempts = report.attempts, error = %e, "giving up on contact");
                    HistoryEntry::failure(&contact, e.to_string(), report.attempts)
                }
            };
            if let Err(e) = self.history.append(entry).await {
                warn!(error = %e, "failed to record history entry");
            }

            let (percent, keep_going) = {
                let mut queue = self.queue();
                let done = queue.total - queue.items.len();
                let percent = rounded_percent(done, queue.total);
                queue.progress_percent = percent;
                (
                    percent,
                    !queue.items.is_empty() && queue.run_state == RunState::Running,
                )
            };
            self.emit(SendEvent::Progress { percent });

            if keep_going {
                let delay = self.pacing.next_delay();
                debug!(?delay, "pacing before next contact");
                tokio::time::sleep(delay).await;
            }
        }

        let (summary, progress) = {
            let mut queue = self.queue();
            // A stop that lands on the last contact changes nothing
            let stopped = queue.run_state == RunState::Stopped && !queue.items.is_empty();
            queue.run_state = RunState::Idle;
            (
                RunSummary {
                    total: queue.total,
                    sent,
                    failed,
                    remaining: queue.items.len(),
                    stopped,
                },
                queue.progress_percent,
            )
        };

        let remaining: Vec<Contact> = self.queue().items.iter().cloned().collect();
        self.persist_queue(&remaining).await;

        if progress == 100 {
            info!(sent, failed, "campaign complete");
            self.emit(SendEvent::success(format!(
                "All messages processed: {} sent, {} failed",
                sent, failed
            )));
        } else if summary.stopped {
            info!(remaining = summary.remaining, "campaign stopped");
            self.emit(SendEvent::error("Message sending stopped"));
        }

        summary
    }

    /// Bounded retry: at most `max_retries + 1` attempts, fixed backoff,
    /// the contact keeps its place in line.
    async fn send_with_retry(&self, contact: &Contact) -> SendReport {
        if !contact.phone_valid {
            debug!(row = contact.row_number, phone = %contact.phone, "attempting invalid-looking phone anyway");
        }

        let variants = phone::variants(&contact.phone);
        let message = template::expand(&contact.message, &contact.template_fields());

        let mut retry_count = 0;
        loop {
            match self.attempt(contact, &variants, &message).await {
                Ok(()) => {
                    return SendReport {
                        attempts: retry_count + 1,
                        result: Ok(()),
                    }
                }
                Err(e) if retry_count < self.pacing.max_retries => {
                    retry_count += 1;
                    warn!(row = contact.row_number, attempt = retry_count, error = %e, "send attempt failed, retrying");
                    tokio::time::sleep(self.pacing.retry_backoff).await;
                }
                Err(e) => {
                    return SendReport {
                        attempts: retry_count + 1,
                        result: Err(e),
                    }
                }
            }
        }
    }

    async fn attempt(&self, contact: &Contact, variants: &[String], message: &str) -> Result<(), AttemptError> {
        let handle = match self
            .transport
            .resolve(&contact.phone, variants, self.pacing.resolve_timeout)
            .await
        {
            Resolution::Resolved(handle) => handle,
            Resolution::NotFound => {
                return Err(AttemptError::ContactNotFound {
                    phone: contact.phone.clone(),
                })
            }
        };

        match self.transport.deliver(&handle, message).await {
            Delivery::Delivered => Ok(()),
            Delivery::Failed(reason) => Err(AttemptError::DeliveryFailed { reason }),
        }
    }

    async fn persist_queue(&self, remaining: &[Contact]) {
        if let Err(e) = store::save_queue(self.store.as_ref(), remaining).await {
            warn!(error = %e, "failed to persist queue");
        }
    }

    fn queue(&self) -> MutexGuard<'_, SendQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `round(100 * done / total)`, half rounding up.
fn rounded_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((200 * done + total) / (2 * total)).min(100) as u8
}
