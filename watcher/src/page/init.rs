//! Drives the page initialization state machine against the backend

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::DashboardApi;
use crate::authn::provider::CredentialProvider;
use crate::errors::{ClassifyMode, FailureCause, WatchError};
use crate::observe::handle::{CancelToken, PollHandle};
use crate::page::fsm::{AuthMessage, Effect, PageEvent, PageState};

#[derive(Debug)]
struct Gate {
    generation: u64,
    state: PageState,
}

/// Outcome of committing an event from a fetch sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Commit {
    Applied(Option<Effect>),
    Stale,
    Rejected,
}

struct Shared {
    gate: Mutex<Gate>,
    tx: watch::Sender<PageState>,
    signed_out: watch::Sender<bool>,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply an event under a new generation, superseding every running sequence
    fn begin(&self, event: PageEvent) -> Result<(u64, Option<Effect>), WatchError> {
        let mut gate = self.lock();
        let (next, effect) = gate.state.next(event)?;
        gate.generation += 1;
        gate.state = next.clone();
        self.tx.send_replace(next);
        Ok((gate.generation, effect))
    }

    /// Apply an event produced by the sequence of `generation`
    fn commit(&self, generation: u64, event: PageEvent) -> Commit {
        let mut gate = self.lock();
        if gate.generation != generation {
            return Commit::Stale;
        }
        match gate.state.next(event) {
            Ok((next, effect)) => {
                if gate.state != next {
                    gate.state = next.clone();
                    self.tx.send_replace(next);
                }
                Commit::Applied(effect)
            }
            Err(e) => {
                warn!("Ignoring page event: {}", e);
                Commit::Rejected
            }
        }
    }
}

/// Sequences "check connection" -> "load repositories" -> "ready".
///
/// Every re-entry starts a new generation; results of older sequences are dropped
/// no matter when they arrive.
pub struct PageInit {
    api: Arc<dyn DashboardApi>,
    credentials: Arc<dyn CredentialProvider>,
    classify: ClassifyMode,
    shared: Arc<Shared>,
    sequence: Option<PollHandle>,
}

impl PageInit {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        credentials: Arc<dyn CredentialProvider>,
        classify: ClassifyMode,
    ) -> Self {
        let (tx, _rx) = watch::channel(PageState::Initializing);
        let (signed_out, _rx) = watch::channel(false);
        Self {
            api,
            credentials,
            classify,
            shared: Arc::new(Shared {
                gate: Mutex::new(Gate {
                    generation: 0,
                    state: PageState::Initializing,
                }),
                tx,
                signed_out,
            }),
            sequence: None,
        }
    }

    pub fn state(&self) -> PageState {
        self.shared.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PageState> {
        self.shared.tx.subscribe()
    }

    /// Flips to true once an expired credential caused a sign out
    pub fn signed_out(&self) -> watch::Receiver<bool> {
        self.shared.signed_out.subscribe()
    }

    /// Current sequence generation
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    /// The signed-in identity is known (or changed)
    pub fn identity_ready(&mut self) -> Result<(), WatchError> {
        self.restart(PageEvent::IdentityReady)
    }

    /// User-triggered retry
    pub fn retry(&mut self) -> Result<(), WatchError> {
        self.restart(PageEvent::Retry)
    }

    /// Message from the external auth popup
    pub fn handle_auth_message(&mut self, message: AuthMessage) -> Result<(), WatchError> {
        info!("Auth flow reported {:?}", message);
        self.restart(message.event())
    }

    fn restart(&mut self, event: PageEvent) -> Result<(), WatchError> {
        let (generation, effect) = self.shared.begin(event)?;
        debug!("Page init generation {}", generation);

        if let Some(previous) = self.sequence.take() {
            previous.cancel();
        }

        if let Some(effect) = effect {
            let sequence = Sequence {
                api: self.api.clone(),
                credentials: self.credentials.clone(),
                classify: self.classify,
                shared: self.shared.clone(),
                generation,
            };
            self.sequence = Some(PollHandle::spawn(generation, move |token| {
                sequence.run(effect, token)
            }));
        }
        Ok(())
    }
}

impl Drop for PageInit {
    fn drop(&mut self) {
        if let Some(sequence) = self.sequence.take() {
            sequence.cancel();
        }
    }
}

struct Sequence {
    api: Arc<dyn DashboardApi>,
    credentials: Arc<dyn CredentialProvider>,
    classify: ClassifyMode,
    shared: Arc<Shared>,
    generation: u64,
}

impl Sequence {
    async fn run(self, mut effect: Effect, token: CancelToken) {
        loop {
            let event = match effect {
                Effect::FetchConnection => match self.api.connection_status().await {
                    Ok(status) => PageEvent::ConnectionChecked {
                        connected: status.connected,
                    },
                    Err(e) => self.failure("connection check", e),
                },
                Effect::FetchRepos => match self.api.list_repos().await {
                    Ok(repos) => PageEvent::ReposLoaded(repos),
                    Err(e) => self.failure("repository list", e),
                },
                Effect::SignOut => {
                    if let Err(e) = self.credentials.sign_out().await {
                        error!("Sign out failed: {}", e);
                    }
                    self.shared.signed_out.send_replace(true);
                    return;
                }
            };

            if token.is_cancelled() {
                debug!("Page init generation {} cancelled", self.generation);
                return;
            }

            match self.shared.commit(self.generation, event) {
                Commit::Applied(Some(next)) => effect = next,
                Commit::Applied(None) | Commit::Rejected => return,
                Commit::Stale => {
                    debug!("Page init generation {} superseded", self.generation);
                    return;
                }
            }
        }
    }

    fn failure(&self, step: &str, err: WatchError) -> PageEvent {
        match FailureCause::classify(&err, self.classify) {
            FailureCause::Auth => {
                warn!("{} failed with an authentication error: {}", step, err);
                PageEvent::AuthExpired
            }
            FailureCause::Generic => {
                error!("{} failed: {}", step, err);
                PageEvent::Failed(err.to_string())
            }
        }
    }
}
