//! Log tailer: repeatedly replaces a shared buffer with an operation's full log

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use openapi_client::models::{DeploymentStatus, LogEntry, LogsResponse};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::WatchError;
use crate::observe::handle::{CancelToken, PollHandle};
use crate::observe::phase::PipelineStatus;

/// Tailer options
#[derive(Debug, Clone)]
pub struct TailerOptions {
    /// Delay between log fetches
    pub interval: Duration,
}

impl Default for TailerOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
        }
    }
}

/// What consumers of the log buffer see
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogView {
    /// Operation whose logs are shown
    pub operation_id: Option<String>,

    /// Full log buffer as last returned by the server
    pub entries: Vec<LogEntry>,

    /// Status that came with the buffer
    pub status: Option<DeploymentStatus>,

    /// True while a tailer is still fetching
    pub tailing: bool,

    /// Bumped on every buffer replacement
    pub revision: u64,
}

#[derive(Debug, Default)]
struct BufferState {
    generation: u64,
    view: LogView,
}

/// Log buffer shared by every tailer of one list.
///
/// Each tailer claims a generation when it starts. Writes carrying an older
/// generation are rejected, so a superseded tailer can never overwrite the
/// buffer of its successor.
#[derive(Debug)]
pub struct LogBuffer {
    state: Mutex<BufferState>,
    tx: watch::Sender<LogView>,
}

impl LogBuffer {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LogView::default());
        Self {
            state: Mutex::new(BufferState::default()),
            tx,
        }
    }

    /// Receiver notified on every buffer change
    pub fn subscribe(&self) -> watch::Receiver<LogView> {
        self.tx.subscribe()
    }

    pub fn view(&self) -> LogView {
        self.tx.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Hand the buffer to a new operation and invalidate older writers
    pub fn claim(&self, operation_id: &str) -> u64 {
        let mut state = self.lock();
        state.generation += 1;
        state.view = LogView {
            operation_id: Some(operation_id.to_string()),
            entries: Vec::new(),
            status: None,
            tailing: true,
            revision: state.view.revision + 1,
        };
        self.tx.send_replace(state.view.clone());
        state.generation
    }

    /// Replace the whole buffer. Returns false when `generation` is superseded
    /// or its tailer was already stopped.
    pub fn replace(
        &self,
        generation: u64,
        entries: Vec<LogEntry>,
        status: DeploymentStatus,
    ) -> bool {
        let mut state = self.lock();
        if state.generation != generation || !state.view.tailing {
            return false;
        }
        state.view.entries = entries;
        state.view.status = Some(status);
        state.view.revision += 1;
        self.tx.send_replace(state.view.clone());
        true
    }

    /// True while the tailer of `generation` owns the buffer and is still fetching
    pub fn is_tailing(&self, generation: u64) -> bool {
        let state = self.lock();
        state.generation == generation && state.view.tailing
    }

    /// Mark the tailer of `generation` as stopped. Returns true only for the call
    /// that stopped it.
    pub fn finish(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation || !state.view.tailing {
            return false;
        }
        state.view.tailing = false;
        self.tx.send_replace(state.view.clone());
        true
    }

    /// Clear the buffer if `generation` still owns it
    pub fn release(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        state.generation += 1;
        state.view = LogView {
            revision: state.view.revision + 1,
            ..LogView::default()
        };
        self.tx.send_replace(state.view.clone());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// A running tail of one operation's log
#[derive(Debug)]
pub struct LogTailer {
    operation_id: String,
    buffer: Arc<LogBuffer>,
    handle: PollHandle,
}

impl LogTailer {
    /// Claim `buffer` for `operation_id` and start fetching.
    ///
    /// `on_complete` runs once, on the first terminal status this tailer publishes.
    pub fn start<F, Fut, C>(
        operation_id: impl Into<String>,
        fetch: F,
        buffer: Arc<LogBuffer>,
        options: &TailerOptions,
        on_complete: C,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<LogsResponse, WatchError>> + Send + 'static,
        C: FnOnce(DeploymentStatus) + Send + 'static,
    {
        let operation_id = operation_id.into();
        let generation = buffer.claim(&operation_id);
        debug!("Tailing logs of {} (generation {})", operation_id, generation);

        let task = TailTask {
            operation_id: operation_id.clone(),
            generation,
            buffer: buffer.clone(),
            interval: options.interval,
            on_complete: Some(Box::new(on_complete)),
        };
        let handle = PollHandle::spawn(generation, move |token| task.run(fetch, token));

        Self {
            operation_id,
            buffer,
            handle,
        }
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn generation(&self) -> u64 {
        self.handle.id()
    }

    /// Stop tailing and invalidate any write still in flight
    pub fn cancel(&self) {
        self.handle.cancel();
        self.buffer.finish(self.handle.id());
    }

    /// Cancel and clear the buffer if this tailer still owns it
    pub fn release(self) {
        self.cancel();
        self.buffer.release(self.handle.id());
    }

    /// True until the tailer is cancelled, superseded or has seen a terminal status
    pub fn is_active(&self) -> bool {
        !self.handle.is_cancelled() && self.buffer.is_tailing(self.handle.id())
    }

    /// Wait for the fetch loop to exit
    pub async fn finished(&mut self) {
        self.handle.finished().await;
    }
}

struct TailTask {
    operation_id: String,
    generation: u64,
    buffer: Arc<LogBuffer>,
    interval: Duration,
    on_complete: Option<Box<dyn FnOnce(DeploymentStatus) + Send>>,
}

impl TailTask {
    async fn run<F, Fut>(mut self, fetch: F, mut token: CancelToken)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<LogsResponse, WatchError>>,
    {
        loop {
            if token.is_cancelled() {
                break;
            }

            match fetch().await {
                Ok(response) => {
                    if token.is_cancelled() {
                        debug!("Dropping logs of {} fetched after cancel", self.operation_id);
                        break;
                    }
                    let status = response.status;
                    if !self.buffer.replace(self.generation, response.logs, status) {
                        debug!("Log buffer of {} is no longer ours", self.operation_id);
                        break;
                    }
                    if status.is_terminal() {
                        info!("Deployment {} finished with {}", self.operation_id, status);
                        if !self.buffer.finish(self.generation) {
                            debug!("Tail of {} stopped before completion", self.operation_id);
                            break;
                        }
                        if let Some(on_complete) = self.on_complete.take() {
                            on_complete(status);
                        }
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to fetch logs of {}: {}", self.operation_id, e);
                }
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.buffer.finish(self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openapi_client::models::LogLevel;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            timestamp: "2025-01-01T00:00:00".to_string(),
            message: message.to_string(),
            level: LogLevel::Info,
        }
    }

    #[test]
    fn test_replace_is_not_append() {
        let buffer = LogBuffer::new();
        let generation = buffer.claim("d-1");
        assert!(buffer.replace(generation, vec![entry("a"), entry("b")], DeploymentStatus::InProgress));
        assert!(buffer.replace(generation, vec![entry("a")], DeploymentStatus::InProgress));
        assert_eq!(buffer.view().entries, vec![entry("a")]);
    }

    #[test]
    fn test_superseded_generation_is_rejected() {
        let buffer = LogBuffer::new();
        let first = buffer.claim("d-1");
        let second = buffer.claim("d-2");
        assert!(!buffer.replace(first, vec![entry("stale")], DeploymentStatus::InProgress));
        assert!(buffer.replace(second, vec![entry("fresh")], DeploymentStatus::InProgress));

        let view = buffer.view();
        assert_eq!(view.operation_id.as_deref(), Some("d-2"));
        assert_eq!(view.entries, vec![entry("fresh")]);
    }

    #[test]
    fn test_release_clears_only_own_generation() {
        let buffer = LogBuffer::new();
        let first = buffer.claim("d-1");
        let second = buffer.claim("d-2");
        buffer.release(first);
        assert_eq!(buffer.view().operation_id.as_deref(), Some("d-2"));

        buffer.release(second);
        let view = buffer.view();
        assert!(view.operation_id.is_none());
        assert!(!view.tailing);
        assert!(!buffer.replace(second, vec![entry("late")], DeploymentStatus::InProgress));
    }

    #[test]
    fn test_finished_generation_rejects_writes() {
        let buffer = LogBuffer::new();
        let generation = buffer.claim("d-1");
        assert!(buffer.finish(generation));
        assert!(!buffer.finish(generation));
        assert!(!buffer.replace(generation, vec![entry("late")], DeploymentStatus::InProgress));
        assert!(buffer.view().entries.is_empty());
    }

    #[test]
    fn test_revision_bumps_on_every_replace() {
        let buffer = LogBuffer::new();
        let generation = buffer.claim("d-1");
        let before = buffer.view().revision;
        buffer.replace(generation, vec![entry("a")], DeploymentStatus::InProgress);
        buffer.replace(generation, vec![entry("a")], DeploymentStatus::InProgress);
        assert_eq!(buffer.view().revision, before + 2);
    }
}
