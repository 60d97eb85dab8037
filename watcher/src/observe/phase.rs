//! Pipeline phase tables and the terminal predicate

use std::fmt::Debug;

use openapi_client::models::{DeploymentStatus, ProjectStatus};

/// Where a status leaves the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ongoing,
    Succeeded,
    Failed,
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Ongoing)
    }
}

/// Ordered list of the ongoing phases of one pipeline kind
#[derive(Debug, Clone, Copy)]
pub struct PhaseTable<S: 'static> {
    phases: &'static [S],
}

impl<S: PartialEq> PhaseTable<S> {
    pub const fn new(phases: &'static [S]) -> Self {
        Self { phases }
    }

    pub fn phases(&self) -> &'static [S] {
        self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn index_of(&self, status: &S) -> Option<usize> {
        self.phases.iter().position(|p| p == status)
    }

    /// Index of `status`, 0 when it is not part of the table
    pub fn phase_index(&self, status: &S) -> usize {
        self.index_of(status).unwrap_or(0)
    }

    pub fn last_index(&self) -> usize {
        self.phases.len().saturating_sub(1)
    }

    /// Fraction of the pipeline completed at `index`, clamped to `[0, 1]`
    pub fn progress(&self, index: usize) -> f64 {
        if self.phases.len() < 2 {
            return if index > 0 { 1.0 } else { 0.0 };
        }
        (index as f64 / (self.phases.len() - 1) as f64).clamp(0.0, 1.0)
    }
}

/// A closed status set with an ordered phase table and a terminal predicate
pub trait PipelineStatus: Clone + PartialEq + Debug + Send + Sync + 'static {
    fn phase_table() -> PhaseTable<Self>;

    fn outcome(&self) -> Outcome;

    fn is_terminal(&self) -> bool {
        self.outcome().is_terminal()
    }
}

/// Build pipeline phases of a project
pub const PROJECT_PHASES: PhaseTable<ProjectStatus> = PhaseTable::new(&[
    ProjectStatus::Pending,
    ProjectStatus::Cloning,
    ProjectStatus::Preparing,
    ProjectStatus::Uploading,
    ProjectStatus::Building,
    ProjectStatus::Deploying,
]);

/// A deployment record only has one ongoing phase
pub const DEPLOYMENT_PHASES: PhaseTable<DeploymentStatus> =
    PhaseTable::new(&[DeploymentStatus::InProgress]);

impl PipelineStatus for ProjectStatus {
    fn phase_table() -> PhaseTable<Self> {
        PROJECT_PHASES
    }

    fn outcome(&self) -> Outcome {
        match self {
            ProjectStatus::Live => Outcome::Succeeded,
            ProjectStatus::Failed => Outcome::Failed,
            _ => Outcome::Ongoing,
        }
    }
}

impl PipelineStatus for DeploymentStatus {
    fn phase_table() -> PhaseTable<Self> {
        DEPLOYMENT_PHASES
    }

    fn outcome(&self) -> Outcome {
        match self {
            DeploymentStatus::Succeeded => Outcome::Succeeded,
            DeploymentStatus::Failed | DeploymentStatus::Stopped | DeploymentStatus::TimedOut => {
                Outcome::Failed
            }
            DeploymentStatus::InProgress | DeploymentStatus::Unknown => Outcome::Ongoing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_phase_index() {
        assert_eq!(PROJECT_PHASES.phase_index(&ProjectStatus::Pending), 0);
        assert_eq!(PROJECT_PHASES.phase_index(&ProjectStatus::Building), 4);
        assert_eq!(PROJECT_PHASES.phase_index(&ProjectStatus::Unknown), 0);
        assert_eq!(PROJECT_PHASES.index_of(&ProjectStatus::Live), None);
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(PROJECT_PHASES.progress(0), 0.0);
        assert_eq!(PROJECT_PHASES.progress(5), 1.0);
        assert_eq!(PROJECT_PHASES.progress(40), 1.0);
        assert!((PROJECT_PHASES.progress(1) - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_terminal_predicate() {
        assert!(ProjectStatus::Live.is_terminal());
        assert!(ProjectStatus::Failed.is_terminal());
        assert!(!ProjectStatus::Deploying.is_terminal());
        assert!(!ProjectStatus::Unknown.is_terminal());

        assert_eq!(DeploymentStatus::Succeeded.outcome(), Outcome::Succeeded);
        assert_eq!(DeploymentStatus::TimedOut.outcome(), Outcome::Failed);
        assert_eq!(DeploymentStatus::InProgress.outcome(), Outcome::Ongoing);
    }

    #[test]
    fn test_single_phase_table_progress() {
        assert_eq!(DEPLOYMENT_PHASES.progress(0), 0.0);
        assert_eq!(DEPLOYMENT_PHASES.last_index(), 0);
    }
}
