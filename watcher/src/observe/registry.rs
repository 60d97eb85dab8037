//! Expansion registry: at most one tailed operation per list

use std::sync::Arc;

use openapi_client::models::{DeploymentStatus, DeploymentSummary};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::api::DashboardApi;
use crate::observe::phase::PipelineStatus;
use crate::observe::tailer::{LogBuffer, LogTailer, TailerOptions};

/// A tailed operation reached a terminal status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub operation_id: String,
    pub status: DeploymentStatus,
}

/// Tracks which deployment of a project's history is expanded and owns its tailer
pub struct ExpansionRegistry {
    api: Arc<dyn DashboardApi>,
    project_id: String,
    buffer: Arc<LogBuffer>,
    options: TailerOptions,
    completions: mpsc::UnboundedSender<Completion>,
    active: Option<LogTailer>,
    explicit: bool,
    auto_expanded: bool,
}

impl ExpansionRegistry {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        project_id: impl Into<String>,
        buffer: Arc<LogBuffer>,
        options: TailerOptions,
        completions: mpsc::UnboundedSender<Completion>,
    ) -> Self {
        Self {
            api,
            project_id: project_id.into(),
            buffer,
            options,
            completions,
            active: None,
            explicit: false,
            auto_expanded: false,
        }
    }

    /// Currently expanded operation
    pub fn expanded(&self) -> Option<&str> {
        self.active.as_ref().map(|t| t.operation_id())
    }

    /// True while the expanded operation is still being fetched
    pub fn is_tailing(&self) -> bool {
        self.active.as_ref().is_some_and(|t| t.is_active())
    }

    pub fn buffer(&self) -> &Arc<LogBuffer> {
        &self.buffer
    }

    /// User expansion of `operation_id`, superseding any other expansion
    pub fn expand(&mut self, operation_id: &str) {
        self.explicit = true;
        self.switch_to(operation_id);
    }

    /// Expand `operation_id`, or collapse it when it is already expanded
    pub fn toggle(&mut self, operation_id: &str) {
        if self.expanded() == Some(operation_id) {
            self.collapse();
        } else {
            self.expand(operation_id);
        }
    }

    /// Cancel the active tailer and clear the selection
    pub fn collapse(&mut self) {
        self.explicit = true;
        if let Some(tailer) = self.active.take() {
            debug!("Collapsing {}", tailer.operation_id());
            tailer.release();
        }
    }

    /// Auto-expand the single in-progress operation of a freshly loaded list.
    ///
    /// Never overrides a user expansion, and fires at most once until
    /// [`reset_selection`](Self::reset_selection). Returns the expanded id.
    pub fn on_list_loaded(&mut self, operations: &[DeploymentSummary]) -> Option<String> {
        if self.explicit || self.auto_expanded || self.active.is_some() {
            return None;
        }

        let mut ongoing = operations.iter().filter(|op| !op.status.is_terminal());
        let candidate = match (ongoing.next(), ongoing.next()) {
            (Some(only), None) => only.deploy_id.clone(),
            _ => return None,
        };

        info!("Auto-expanding in-progress deployment {}", candidate);
        self.auto_expanded = true;
        self.switch_to(&candidate);
        Some(candidate)
    }

    /// Forget past selections so the next list load may auto-expand again
    pub fn reset_selection(&mut self) {
        self.explicit = false;
        self.auto_expanded = false;
    }

    fn switch_to(&mut self, operation_id: &str) {
        if self.expanded() == Some(operation_id) {
            return;
        }

        // The previous tailer must be cancelled before the next one claims the buffer
        if let Some(previous) = self.active.take() {
            debug!("Superseding {} with {}", previous.operation_id(), operation_id);
            previous.cancel();
        }

        let api = self.api.clone();
        let project_id = self.project_id.clone();
        let deploy_id = operation_id.to_string();
        let fetch = move || {
            let api = api.clone();
            let project_id = project_id.clone();
            let deploy_id = deploy_id.clone();
            async move { api.deployment_logs(&project_id, &deploy_id).await }
        };

        let completions = self.completions.clone();
        let completed_id = operation_id.to_string();
        let on_complete = move |status: DeploymentStatus| {
            let _ = completions.send(Completion {
                operation_id: completed_id,
                status,
            });
        };

        self.active = Some(LogTailer::start(
            operation_id,
            fetch,
            self.buffer.clone(),
            &self.options,
            on_complete,
        ));
    }
}

impl Drop for ExpansionRegistry {
    fn drop(&mut self) {
        if let Some(tailer) = self.active.take() {
            tailer.release();
        }
    }
}
