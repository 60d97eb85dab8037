//! Main application run loop

use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;

use openapi_client::models::{ProjectStatus, ProjectStatusResponse};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::DashboardApi;
use crate::app::commands::Command;
use crate::app::console::Console;
use crate::app::options::WatchOptions;
use crate::authn::provider::CredentialProvider;
use crate::errors::WatchError;
use crate::observe::poller::StatusPoller;
use crate::observe::registry::{Completion, ExpansionRegistry};
use crate::observe::tailer::LogBuffer;
use crate::page::fsm::PageState;
use crate::page::init::PageInit;

/// Why the watcher stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The project reached a terminal status and every tailer finished
    Completed(ProjectStatus),
    /// The credential expired and was dropped
    SignedOut,
    Quit,
    Shutdown,
}

/// Run the watcher: gate on the page initialization, then follow the project
pub async fn run<W: Write>(
    options: WatchOptions,
    api: Arc<dyn DashboardApi>,
    credentials: Arc<dyn CredentialProvider>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    out: W,
    shutdown_signal: impl Future<Output = ()>,
) -> Result<RunOutcome, WatchError> {
    info!("Watching project {}", options.project_id);
    tokio::pin!(shutdown_signal);
    let mut console = Console::new(out);

    let mut page = PageInit::new(api.clone(), credentials, options.classify);
    if let Some(outcome) = await_ready(
        &mut page,
        &api,
        &mut commands,
        &mut console,
        shutdown_signal.as_mut(),
    )
    .await?
    {
        return Ok(outcome);
    }

    follow_project(&options, &api, &mut commands, &mut console, shutdown_signal.as_mut()).await
}

// =============================== PAGE INITIALIZATION ================================== //

/// Drive [`PageInit`] until it is ready. Returns an outcome when the run must stop early.
async fn await_ready<W: Write>(
    page: &mut PageInit,
    api: &Arc<dyn DashboardApi>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    console: &mut Console<W>,
    mut shutdown: Pin<&mut impl Future<Output = ()>>,
) -> Result<Option<RunOutcome>, WatchError> {
    let mut states = page.subscribe();
    let mut signed_out = page.signed_out();
    let mut commands_open = true;
    page.identity_ready()?;

    loop {
        let state = states.borrow_and_update().clone();
        console.page_state(&state);
        match &state {
            PageState::Ready(_) => return Ok(None),
            PageState::NotConnected => match api.auth_url().await {
                Ok(auth) => console.auth_url(&auth.url),
                Err(e) => warn!("Unable to fetch the GitHub authorization URL: {}", e),
            },
            _ => {}
        }

        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received, shutting down...");
                return Ok(Some(RunOutcome::Shutdown));
            }
            changed = states.changed() => {
                changed.map_err(|e| WatchError::Internal(e.to_string()))?;
            }
            changed = signed_out.changed() => {
                changed.map_err(|e| WatchError::Internal(e.to_string()))?;
                if *signed_out.borrow() {
                    console.notice("Session expired, signed out. Sign in again and restart.");
                    return Ok(Some(RunOutcome::SignedOut));
                }
            }
            command = commands.recv(), if commands_open => {
                let Some(command) = command else {
                    debug!("Command input closed");
                    commands_open = false;
                    continue;
                };
                let result = match command {
                    Command::Retry => page.retry(),
                    Command::Auth(message) => page.handle_auth_message(message),
                    Command::Quit => return Ok(Some(RunOutcome::Quit)),
                    other => {
                        console.notice(&format!("{:?} is only available once ready", other));
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    warn!("Command rejected: {}", e);
                    console.notice(&e.to_string());
                }
            }
        }
    }
}

// =============================== PROJECT OBSERVATION ================================== //

fn start_status_poller(
    api: &Arc<dyn DashboardApi>,
    options: &WatchOptions,
) -> StatusPoller<ProjectStatusResponse> {
    let api = api.clone();
    let project_id = options.project_id.clone();
    StatusPoller::start(
        move || {
            let api = api.clone();
            let project_id = project_id.clone();
            async move { api.project_status(&project_id).await }
        },
        &options.status_poller,
    )
}

async fn follow_project<W: Write>(
    options: &WatchOptions,
    api: &Arc<dyn DashboardApi>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    console: &mut Console<W>,
    mut shutdown: Pin<&mut impl Future<Output = ()>>,
) -> Result<RunOutcome, WatchError> {
    let buffer = Arc::new(LogBuffer::new());
    let mut logs = buffer.subscribe();
    let (completion_tx, mut completions) = mpsc::unbounded_channel::<Completion>();
    let mut registry = ExpansionRegistry::new(
        api.clone(),
        options.project_id.clone(),
        buffer,
        options.log_tailer.clone(),
        completion_tx,
    );

    let mut poller = start_status_poller(api, options);
    let mut observations = poller.subscribe();
    let mut last_status: Option<ProjectStatus> = None;
    let mut commands_open = true;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received, shutting down...");
                poller.cancel();
                return Ok(RunOutcome::Shutdown);
            }
            changed = observations.changed() => {
                changed.map_err(|e| WatchError::Internal(e.to_string()))?;
                let latest = observations.borrow_and_update().clone();
                let Some(observation) = latest else {
                    continue;
                };
                console.status(&observation);
                if last_status.as_ref() != Some(&observation.snapshot.status) {
                    last_status = Some(observation.snapshot.status);
                    load_history(api, &options.project_id, &mut registry, console).await;
                }
            }
            changed = logs.changed() => {
                changed.map_err(|e| WatchError::Internal(e.to_string()))?;
                let view = logs.borrow_and_update().clone();
                console.logs(&view);
            }
            Some(completion) = completions.recv() => {
                console.completion(&completion);
                poller.refresh_now();
            }
            command = commands.recv(), if commands_open => {
                let Some(command) = command else {
                    debug!("Command input closed");
                    commands_open = false;
                    continue;
                };
                match command {
                    Command::Toggle(deploy_id) => registry.toggle(&deploy_id),
                    Command::Collapse => registry.collapse(),
                    Command::Retry => poller.refresh_now(),
                    Command::Auth(_) => console.notice("GitHub is already connected"),
                    Command::Quit => {
                        poller.cancel();
                        return Ok(RunOutcome::Quit);
                    }
                    Command::Redeploy => match api.redeploy(&options.project_id).await {
                        Ok(response) => {
                            info!("Redeploy of {} accepted: {}", response.project_id, response.message);
                            console.notice(&response.message);
                            poller.cancel();
                            poller = start_status_poller(api, options);
                            observations = poller.subscribe();
                            last_status = None;
                            registry.reset_selection();
                        }
                        Err(e) => {
                            error!("Redeploy failed: {}", e);
                            console.notice(&format!("Redeploy failed: {}", e));
                        }
                    },
                }
            }
        }

        if options.follow || registry.is_tailing() {
            continue;
        }
        let terminal = poller
            .latest()
            .filter(|observation| observation.outcome.is_terminal());
        if let Some(observation) = terminal {
            while let Ok(completion) = completions.try_recv() {
                console.completion(&completion);
            }
            console.logs(&registry.buffer().view());
            info!("Project {} is {}", options.project_id, observation.snapshot.status);
            return Ok(RunOutcome::Completed(observation.snapshot.status));
        }
    }
}

/// Feed the deployment history to the registry so it can auto-expand
async fn load_history<W: Write>(
    api: &Arc<dyn DashboardApi>,
    project_id: &str,
    registry: &mut ExpansionRegistry,
    console: &mut Console<W>,
) {
    match api.project_details(project_id).await {
        Ok(details) => {
            if let Some(deploy_id) = registry.on_list_loaded(&details.deployments) {
                console.notice(&format!("Following deployment {}", deploy_id));
            }
        }
        Err(e) => warn!("Failed to load deployments of {}: {}", project_id, e),
    }
}
