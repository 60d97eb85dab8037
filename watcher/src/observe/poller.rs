//! Status poller: observes a remote operation until it reaches a terminal status

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use openapi_client::models::{ProjectStatus, ProjectStatusResponse};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::WatchError;
use crate::observe::handle::{CancelToken, PollHandle};
use crate::observe::phase::{Outcome, PipelineStatus};

/// A snapshot type carrying a pipeline status
pub trait Observed: Clone + Send + Sync + 'static {
    type Status: PipelineStatus;

    fn status(&self) -> &Self::Status;
}

impl Observed for ProjectStatusResponse {
    type Status = ProjectStatus;

    fn status(&self) -> &ProjectStatus {
        &self.status
    }
}

/// Poller options
#[derive(Debug, Clone)]
pub struct PollerOptions {
    /// Delay between the end of one fetch and the start of the next
    pub interval: Duration,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
        }
    }
}

/// A published snapshot with its derived phase position
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<S> {
    /// Issue order of the fetch that produced this snapshot
    pub seq: u64,
    pub snapshot: S,
    pub phase_index: usize,
    pub progress: f64,
    pub outcome: Outcome,
}

/// Result of offering a fetched snapshot for publication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    Published { terminal: bool },
    Stale,
    Regressed,
    Cancelled,
    Finished,
}

#[derive(Debug, Default)]
struct Gate {
    cancelled: bool,
    finished: bool,
    last_seq: u64,
    last_phase: Option<usize>,
}

type FetchFn<S> = dyn Fn() -> BoxFuture<'static, Result<S, WatchError>> + Send + Sync;

struct Shared<S> {
    gate: Mutex<Gate>,
    next_seq: AtomicU64,
    tx: watch::Sender<Option<Observation<S>>>,
    fetch: Box<FetchFn<S>>,
}

impl<S: Observed> Shared<S> {
    fn issue(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_done(&self) -> bool {
        let gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        gate.cancelled || gate.finished
    }

    fn cancel(&self) {
        let mut gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        gate.cancelled = true;
    }

    fn publish(&self, seq: u64, snapshot: S) -> Publish {
        let mut gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        if gate.cancelled {
            return Publish::Cancelled;
        }
        if gate.finished {
            return Publish::Finished;
        }
        if seq <= gate.last_seq {
            return Publish::Stale;
        }

        let table = <S::Status as PipelineStatus>::phase_table();
        let status = snapshot.status();
        let outcome = status.outcome();
        let phase_index = match outcome {
            Outcome::Ongoing => {
                let index = table.phase_index(status);
                if gate.last_phase.is_some_and(|last| index < last) {
                    return Publish::Regressed;
                }
                index
            }
            Outcome::Succeeded => table.last_index(),
            Outcome::Failed => gate.last_phase.unwrap_or(0),
        };

        gate.last_seq = seq;
        gate.last_phase = Some(phase_index);
        gate.finished = outcome.is_terminal();

        self.tx.send_replace(Some(Observation {
            seq,
            snapshot,
            phase_index,
            progress: table.progress(phase_index),
            outcome,
        }));

        Publish::Published {
            terminal: outcome.is_terminal(),
        }
    }

    async fn fetch_and_publish(&self) -> Publish {
        let seq = self.issue();
        match (self.fetch)().await {
            Ok(snapshot) => {
                let result = self.publish(seq, snapshot);
                if !matches!(result, Publish::Published { .. }) {
                    debug!("Discarded snapshot #{}: {:?}", seq, result);
                }
                result
            }
            Err(e) => {
                warn!("Status fetch #{} failed, retrying next tick: {}", seq, e);
                Publish::Stale
            }
        }
    }
}

/// Polls a status-fetching operation at a fixed cadence until terminal or cancelled
pub struct StatusPoller<S: Observed> {
    shared: Arc<Shared<S>>,
    rx: watch::Receiver<Option<Observation<S>>>,
    handle: PollHandle,
}

impl<S: Observed> StatusPoller<S> {
    /// Fetch once immediately, then every `interval` while the status is ongoing
    pub fn start<F, Fut>(fetch: F, options: &PollerOptions) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, WatchError>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let shared = Arc::new(Shared {
            gate: Mutex::new(Gate::default()),
            next_seq: AtomicU64::new(0),
            tx,
            fetch: Box::new(move || -> BoxFuture<'static, Result<S, WatchError>> {
                Box::pin(fetch())
            }),
        });

        let interval = options.interval;
        let task_shared = shared.clone();
        let handle = PollHandle::spawn(0, move |token| poll_loop(task_shared, interval, token));

        Self { shared, rx, handle }
    }

    /// Latest published observation
    pub fn latest(&self) -> Option<Observation<S>> {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Observation<S>>> {
        self.rx.clone()
    }

    /// Issue an out-of-band fetch; it only publishes if no newer fetch beat it
    pub fn refresh_now(&self) {
        if self.shared.is_done() {
            return;
        }
        let shared = self.shared.clone();
        tokio::spawn(async move {
            shared.fetch_and_publish().await;
        });
    }

    /// Stop polling; results still in flight are dropped on arrival
    pub fn cancel(&self) {
        self.shared.cancel();
        self.handle.cancel();
    }

    /// True while the poller may still publish
    pub fn is_running(&self) -> bool {
        !self.shared.is_done() && !self.handle.is_finished()
    }

    /// Wait for the polling loop to exit
    pub async fn finished(&mut self) {
        self.handle.finished().await;
    }
}

impl<S: Observed> Drop for StatusPoller<S> {
    fn drop(&mut self) {
        self.shared.cancel();
    }
}

async fn poll_loop<S: Observed>(shared: Arc<Shared<S>>, interval: Duration, mut token: CancelToken) {
    loop {
        if token.is_cancelled() || shared.is_done() {
            break;
        }

        if let Publish::Published { terminal: true } = shared.fetch_and_publish().await {
            info!("Operation reached a terminal status, polling stopped");
            break;
        }

        tokio::select! {
            _ = token.cancelled() => {
                debug!("Status poller cancelled");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    if token.is_cancelled() {
        shared.cancel();
    }
}
