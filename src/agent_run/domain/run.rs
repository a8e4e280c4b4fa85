//! Agent run aggregate and report application rules.

use super::{
    AgentRunDomainError, AgentRunId, ExternalRunId, PullRequest, PullRequestStatus, ReportDigest,
    RunStatus, RunStatusReport, RunType,
};
use crate::task::domain::TaskId;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Error message recorded on runs abandoned by cancellation.
pub const ABANDONED_MESSAGE: &str = "run abandoned";

/// Status change produced by applying a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTransition {
    /// Status before the report.
    pub from: RunStatus,
    /// Status after the report.
    pub to: RunStatus,
}

impl RunTransition {
    /// Returns `true` when the report moved the run into a terminal status.
    #[must_use]
    pub const fn reached_terminal(self) -> bool {
        !self.from.is_terminal() && self.to.is_terminal()
    }
}

/// Reason a report or event was dropped without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReport {
    /// No run carries the reported external identifier.
    UnknownRun,
    /// No run carries the reported pull request URL.
    UnknownPullRequest,
    /// The run is already terminal (including abandoned runs).
    AlreadyTerminal,
    /// An identical report was already applied.
    Duplicate,
    /// The report's sequence number is not newer than the last applied one.
    Stale,
    /// The report would move the run status backwards.
    Regression,
    /// The run is no longer the task's current run of its type.
    Superseded,
}

impl IgnoredReport {
    /// Returns a short label for log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownRun => "unknown_run",
            Self::UnknownPullRequest => "unknown_pull_request",
            Self::AlreadyTerminal => "already_terminal",
            Self::Duplicate => "duplicate",
            Self::Stale => "stale",
            Self::Regression => "regression",
            Self::Superseded => "superseded",
        }
    }
}

/// Result of applying a status report to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportDisposition {
    /// The report changed the run.
    Applied(RunTransition),
    /// The report was dropped.
    Ignored(IgnoredReport),
}

/// Result of recording a pull request status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestChange {
    /// The pull request moved to a new status.
    Changed {
        /// Previous status.
        from: PullRequestStatus,
        /// New status.
        to: PullRequestStatus,
    },
    /// The pull request already had the reported status.
    Unchanged,
    /// The status change is not permitted (for example, after a merge).
    Rejected {
        /// Current status.
        from: PullRequestStatus,
        /// Requested status.
        to: PullRequestStatus,
    },
}

/// One dispatch of work to the external coding-agent service.
///
/// Runs are never deleted; terminal runs stay behind as audit history once
/// a newer run supersedes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRun {
    id: AgentRunId,
    task_id: TaskId,
    run_type: RunType,
    external_run_id: Option<ExternalRunId>,
    status: RunStatus,
    abandoned: bool,
    instructions: Option<String>,
    pull_request: Option<PullRequest>,
    summary: Option<String>,
    error_message: Option<String>,
    last_sequence: Option<u64>,
    last_report_digest: Option<ReportDigest>,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedAgentRunData {
    /// Persisted run identifier.
    pub id: AgentRunId,
    /// Owning task.
    pub task_id: TaskId,
    /// Persisted run type.
    pub run_type: RunType,
    /// External runner identifier, once dispatched.
    pub external_run_id: Option<ExternalRunId>,
    /// Persisted run status.
    pub status: RunStatus,
    /// Whether the run was abandoned by cancellation.
    pub abandoned: bool,
    /// Incremental instructions for follow-up runs.
    pub instructions: Option<String>,
    /// Pull request produced or inherited by the run.
    pub pull_request: Option<PullRequest>,
    /// Runner summary text.
    pub summary: Option<String>,
    /// Failure message.
    pub error_message: Option<String>,
    /// Last applied runner sequence number.
    pub last_sequence: Option<u64>,
    /// Digest of the last applied report.
    pub last_report_digest: Option<ReportDigest>,
    /// Creation timestamp.
    pub started_at: DateTime<Utc>,
    /// Latest change timestamp.
    pub updated_at: DateTime<Utc>,
    /// Terminal timestamp.
    pub finished_at: Option<DateTime<Utc>>,
}

impl AgentRun {
    /// Creates a run in the `Creating` status.
    #[must_use]
    pub fn new(task_id: TaskId, run_type: RunType, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: AgentRunId::new(),
            task_id,
            run_type,
            external_run_id: None,
            status: RunStatus::Creating,
            abandoned: false,
            instructions: None,
            pull_request: None,
            summary: None,
            error_message: None,
            last_sequence: None,
            last_report_digest: None,
            started_at: timestamp,
            updated_at: timestamp,
            finished_at: None,
        }
    }

    /// Sets incremental instructions for a follow-up run.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Carries over the pull request of the run this one follows up on.
    #[must_use]
    pub fn with_inherited_pull_request(mut self, pull_request: Option<PullRequest>) -> Self {
        self.pull_request = pull_request;
        self
    }

    /// Reconstructs a run from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedAgentRunData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            run_type: data.run_type,
            external_run_id: data.external_run_id,
            status: data.status,
            abandoned: data.abandoned,
            instructions: data.instructions,
            pull_request: data.pull_request,
            summary: data.summary,
            error_message: data.error_message,
            last_sequence: data.last_sequence,
            last_report_digest: data.last_report_digest,
            started_at: data.started_at,
            updated_at: data.updated_at,
            finished_at: data.finished_at,
        }
    }

    /// Returns the run identifier.
    #[must_use]
    pub const fn id(&self) -> AgentRunId {
        self.id
    }

    /// Returns the owning task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the run type.
    #[must_use]
    pub const fn run_type(&self) -> RunType {
        self.run_type
    }

    /// Returns the external runner identifier, once dispatched.
    #[must_use]
    pub const fn external_run_id(&self) -> Option<&ExternalRunId> {
        self.external_run_id.as_ref()
    }

    /// Returns the run status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns `true` while the run is not terminal.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Returns `true` when the run was abandoned by cancellation.
    #[must_use]
    pub const fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    /// Returns follow-up instructions, if any.
    #[must_use]
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    /// Returns the pull request, if any.
    #[must_use]
    pub const fn pull_request(&self) -> Option<&PullRequest> {
        self.pull_request.as_ref()
    }

    /// Returns the runner summary, if any.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Returns the failure message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Returns the last applied runner sequence number.
    #[must_use]
    pub const fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    /// Returns the digest of the last applied report.
    #[must_use]
    pub const fn last_report_digest(&self) -> Option<&ReportDigest> {
        self.last_report_digest.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the latest change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the terminal timestamp; set iff the run is terminal.
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Returns whether the run has been active for at least `max_duration`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, max_duration: TimeDelta) -> bool {
        self.is_active() && now.signed_duration_since(self.started_at) >= max_duration
    }

    /// Records the identifier the external runner assigned to this run.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRunDomainError::RunTerminal`] when the run is terminal
    /// or [`AgentRunDomainError::AlreadyDispatched`] when an identifier is
    /// already recorded.
    pub fn mark_dispatched(
        &mut self,
        external_run_id: ExternalRunId,
        clock: &impl Clock,
    ) -> Result<(), AgentRunDomainError> {
        if self.status.is_terminal() {
            return Err(AgentRunDomainError::RunTerminal(self.id));
        }
        if self.external_run_id.is_some() {
            return Err(AgentRunDomainError::AlreadyDispatched(self.id));
        }
        self.external_run_id = Some(external_run_id);
        self.touch(clock);
        Ok(())
    }

    /// Applies an external status report.
    ///
    /// Reports against terminal runs, stale or repeated reports, and reports
    /// that would move the status backwards are ignored without mutation.
    pub fn apply_report(
        &mut self,
        report: &RunStatusReport,
        clock: &impl Clock,
    ) -> ReportDisposition {
        if self.status.is_terminal() {
            return ReportDisposition::Ignored(IgnoredReport::AlreadyTerminal);
        }
        if let (Some(last), Some(sequence)) = (self.last_sequence, report.sequence()) {
            if sequence <= last {
                return ReportDisposition::Ignored(IgnoredReport::Stale);
            }
        }
        let digest = report.digest();
        if self.last_report_digest.as_ref() == Some(&digest) {
            return ReportDisposition::Ignored(IgnoredReport::Duplicate);
        }

        let from = self.status;
        let to = report.status();
        if from != to && !from.can_advance_to(to) {
            return ReportDisposition::Ignored(IgnoredReport::Regression);
        }

        if let Some(pull_request) = report.pull_request() {
            self.pull_request = Some(pull_request.clone());
        }
        if let Some(summary) = report.summary() {
            self.summary = Some(summary.to_owned());
        }
        if let Some(error) = report.error() {
            self.error_message = Some(error.to_owned());
        }
        if report.sequence().is_some() {
            self.last_sequence = report.sequence();
        }
        self.last_report_digest = Some(digest);
        self.status = to;
        self.touch(clock);
        if to.is_terminal() {
            self.finished_at = Some(self.updated_at);
        }

        ReportDisposition::Applied(RunTransition { from, to })
    }

    /// Marks an active run as abandoned.
    ///
    /// Returns `false` when the run was already terminal.
    pub fn abandon(&mut self, clock: &impl Clock) -> bool {
        if !self.force_fail(ABANDONED_MESSAGE, clock) {
            return false;
        }
        self.abandoned = true;
        true
    }

    /// Moves an active run to `Failed` with the given message.
    ///
    /// Returns `false` when the run was already terminal.
    pub fn force_fail(&mut self, message: impl Into<String>, clock: &impl Clock) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = RunStatus::Failed;
        self.error_message = Some(message.into());
        self.touch(clock);
        self.finished_at = Some(self.updated_at);
        true
    }

    /// Records a pull request status change reported by the source host.
    ///
    /// Pull request updates are accepted on terminal runs because reviews
    /// happen after the run has finished.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRunDomainError::MissingPullRequest`] when the run has no
    /// pull request.
    pub fn record_pull_request_status(
        &mut self,
        status: PullRequestStatus,
        clock: &impl Clock,
    ) -> Result<PullRequestChange, AgentRunDomainError> {
        let run_id = self.id;
        let pull_request = self
            .pull_request
            .as_mut()
            .ok_or(AgentRunDomainError::MissingPullRequest(run_id))?;
        let from = pull_request.status();
        if from == status {
            return Ok(PullRequestChange::Unchanged);
        }
        if !from.can_transition_to(status) {
            return Ok(PullRequestChange::Rejected { from, to: status });
        }
        pull_request.set_status(status);
        self.touch(clock);
        Ok(PullRequestChange::Changed { from, to: status })
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
