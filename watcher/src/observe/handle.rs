//! Cancellation handles for polling tasks

use std::future::Future;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Task-side view of a [`PollHandle`]
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// True once the owning handle was cancelled or dropped
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves when the owning handle is cancelled or dropped
    pub async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Exclusive owner of a running poll task. Dropping it cancels the task.
#[derive(Debug)]
pub struct PollHandle {
    id: u64,
    cancel_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Spawn `body` with a fresh token; `id` is the caller's generation tag
    pub fn spawn<F, Fut>(id: u64, body: F) -> Self
    where
        F: FnOnce(CancelToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, rx) = watch::channel(false);
        let task = tokio::spawn(body(CancelToken { rx }));
        Self {
            id,
            cancel_tx,
            task: Some(task),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// True when the task has returned
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the task to return
    pub async fn finished(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel_tx.send_replace(true);
    }
}
