//! Terminal rendering of the observed state

use std::io::Write;

use colored::{Color, Colorize};
use openapi_client::models::{LogEntry, LogLevel, ProjectStatusResponse};

use crate::observe::phase::{Outcome, PipelineStatus};
use crate::observe::poller::Observation;
use crate::observe::registry::Completion;
use crate::observe::tailer::LogView;
use crate::page::fsm::PageState;
use crate::utils::progress_bar;

const BAR_WIDTH: usize = 24;

fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Info => Color::White,
        LogLevel::Warn => Color::Yellow,
        LogLevel::Error => Color::Red,
        LogLevel::Success => Color::Green,
    }
}

fn outcome_color(outcome: Outcome) -> Color {
    match outcome {
        Outcome::Ongoing => Color::Cyan,
        Outcome::Succeeded => Color::Green,
        Outcome::Failed => Color::Red,
    }
}

/// Writes human-readable progress to a terminal.
///
/// Log buffers are replaced wholesale on every poll, so the console remembers
/// how many entries of the current operation it already printed, and the last
/// of them, and only writes the tail. A buffer that no longer starts with what
/// was printed, or a new operation, reprints from the top.
pub struct Console<W: Write> {
    out: W,
    log_operation: Option<String>,
    printed: usize,
    last_printed: Option<LogEntry>,
    last_revision: Option<u64>,
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            log_operation: None,
            printed: 0,
            last_printed: None,
            last_revision: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn page_state(&mut self, state: &PageState) {
        let line = match state {
            PageState::Initializing => "Waiting for sign-in...".dimmed().to_string(),
            PageState::CheckingConnection => "Checking GitHub connection...".dimmed().to_string(),
            PageState::NotConnected => format!(
                "{} Connect GitHub, then type `connected` (or paste the popup payload)",
                "GitHub is not connected.".yellow()
            ),
            PageState::LoadingRepos => "Loading repositories...".dimmed().to_string(),
            PageState::Ready(repos) => format!(
                "{} {} repositories available",
                "Ready:".green().bold(),
                repos.len()
            ),
            PageState::Error(message) => format!(
                "{} {} (type `retry`)",
                "Error:".red().bold(),
                message
            ),
        };
        let _ = writeln!(self.out, "{}", line);
    }

    pub fn auth_url(&mut self, url: &str) {
        let _ = writeln!(self.out, "Authorize at {}", url.underline());
    }

    pub fn status(&mut self, observation: &Observation<ProjectStatusResponse>) {
        let snapshot = &observation.snapshot;
        let table = <openapi_client::models::ProjectStatus as PipelineStatus>::phase_table();
        let _ = writeln!(
            self.out,
            "{} {} {:>3.0}% {} (phase {}/{})",
            snapshot.project_id.bold(),
            progress_bar(observation.progress, BAR_WIDTH),
            observation.progress * 100.0,
            snapshot.status.as_str().color(outcome_color(observation.outcome)),
            observation.phase_index + 1,
            table.len(),
        );
        if let (Outcome::Succeeded, Some(url)) = (observation.outcome, &snapshot.function_url) {
            let _ = writeln!(self.out, "Live at {}", url.underline());
        }
    }

    /// Print entries of `view` not yet shown
    pub fn logs(&mut self, view: &LogView) {
        if self.last_revision == Some(view.revision) {
            return;
        }
        self.last_revision = Some(view.revision);

        let Some(operation_id) = view.operation_id.as_deref() else {
            if self.log_operation.take().is_some() {
                let _ = writeln!(self.out, "{}", "Logs collapsed".dimmed());
            }
            self.printed = 0;
            self.last_printed = None;
            return;
        };

        if self.log_operation.as_deref() != Some(operation_id) {
            let _ = writeln!(self.out, "{} {}", "Logs of".dimmed(), operation_id.bold());
            self.log_operation = Some(operation_id.to_string());
            self.printed = 0;
        } else if !self.continues(&view.entries) {
            let _ = writeln!(self.out, "{}", "Log buffer rewound, reprinting".dimmed());
            self.printed = 0;
        }

        for entry in &view.entries[self.printed..] {
            self.log_entry(entry);
        }
        self.printed = view.entries.len();
        self.last_printed = view.entries.last().cloned();
    }

    /// True when `entries` still holds the last printed entry at the same position
    fn continues(&self, entries: &[LogEntry]) -> bool {
        match self.printed.checked_sub(1) {
            None => true,
            Some(last) => entries.get(last) == self.last_printed.as_ref(),
        }
    }

    pub fn completion(&mut self, completion: &Completion) {
        let outcome = completion.status.outcome();
        let _ = writeln!(
            self.out,
            "Deployment {} finished: {}",
            completion.operation_id.bold(),
            completion.status.as_str().color(outcome_color(outcome))
        );
    }

    pub fn notice(&mut self, message: &str) {
        let _ = writeln!(self.out, "{}", message.dimmed());
    }

    fn log_entry(&mut self, entry: &LogEntry) {
        let _ = writeln!(
            self.out,
            "{} {}",
            entry.timestamp.dimmed(),
            entry.message.color(level_color(entry.level))
        );
    }
}
