//! Inbound status reports from the external runner and source-control host.

use super::{
    AgentRunId, ExternalRunId, PullRequest, PullRequestStatus, PullRequestUrl, RunStatus,
};
use crate::task::domain::ClosedPullRequestDisposition;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const FIELD_SEPARATOR: [u8; 1] = [0x1f];

/// Status report for one external run, delivered by callback or polling.
///
/// Runners that may call back before `create_run` has returned should echo
/// the dispatched run identifier with [`RunStatusReport::with_run_id`].
///
/// # Examples
///
///     use tasklane::agent_run::domain::{ExternalRunId, RunStatus, RunStatusReport};
///
///     let report = RunStatusReport::new(
///         ExternalRunId::new("bc-42").expect("valid id"),
///         RunStatus::Finished,
///     )
///     .with_summary("plan ready");
///     assert_eq!(report.summary(), Some("plan ready"));
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatusReport {
    external_run_id: ExternalRunId,
    run_id: Option<AgentRunId>,
    status: RunStatus,
    pull_request: Option<PullRequest>,
    summary: Option<String>,
    error: Option<String>,
    sequence: Option<u64>,
}

impl RunStatusReport {
    /// Creates a report carrying only a status.
    #[must_use]
    pub const fn new(external_run_id: ExternalRunId, status: RunStatus) -> Self {
        Self {
            external_run_id,
            run_id: None,
            status,
            pull_request: None,
            summary: None,
            error: None,
            sequence: None,
        }
    }

    /// Attaches the internal run identifier the runner was dispatched with.
    #[must_use]
    pub const fn with_run_id(mut self, run_id: AgentRunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Attaches the pull request the run opened.
    #[must_use]
    pub fn with_pull_request(mut self, pull_request: PullRequest) -> Self {
        self.pull_request = Some(pull_request);
        self
    }

    /// Attaches the runner's summary text.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Attaches the runner's error message.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Attaches the runner-supplied monotonic sequence number.
    #[must_use]
    pub const fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Returns the external run identifier.
    #[must_use]
    pub const fn external_run_id(&self) -> &ExternalRunId {
        &self.external_run_id
    }

    /// Returns the internal run identifier, if the runner echoed it.
    #[must_use]
    pub const fn run_id(&self) -> Option<AgentRunId> {
        self.run_id
    }

    /// Returns the reported status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns the reported pull request, if any.
    #[must_use]
    pub const fn pull_request(&self) -> Option<&PullRequest> {
        self.pull_request.as_ref()
    }

    /// Returns the reported summary, if any.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Returns the reported error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the runner-supplied sequence number, if any.
    #[must_use]
    pub const fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// Computes the idempotency digest of this report.
    ///
    /// Two reports with identical content produce the same digest. The
    /// internal run identifier only routes the report and is not hashed.
    #[must_use]
    pub fn digest(&self) -> ReportDigest {
        let mut hasher = Sha256::new();
        hasher.update(self.external_run_id.as_str().as_bytes());
        hasher.update(FIELD_SEPARATOR);
        hasher.update(self.status.as_str().as_bytes());
        hasher.update(FIELD_SEPARATOR);
        if let Some(pull_request) = &self.pull_request {
            hasher.update(pull_request.url().as_str().as_bytes());
            hasher.update(pull_request.number().to_string().as_bytes());
        }
        hasher.update(FIELD_SEPARATOR);
        hash_optional(&mut hasher, self.summary.as_deref());
        hash_optional(&mut hasher, self.error.as_deref());
        if let Some(sequence) = self.sequence {
            hasher.update(sequence.to_string().as_bytes());
        }
        ReportDigest(format!("{:x}", hasher.finalize()))
    }
}

fn hash_optional(hasher: &mut Sha256, value: Option<&str>) {
    if let Some(text) = value {
        hasher.update([1_u8]);
        hasher.update(text.as_bytes());
    } else {
        hasher.update([0_u8]);
    }
    hasher.update(FIELD_SEPARATOR);
}

/// Hex-encoded SHA-256 digest of an applied status report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportDigest(String);

impl ReportDigest {
    /// Wraps a persisted digest value.
    #[must_use]
    pub const fn from_persisted(value: String) -> Self {
        Self(value)
    }

    /// Returns the digest as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pull request status change delivered by the source-control webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    url: PullRequestUrl,
    status: PullRequestStatus,
    closed_disposition: Option<ClosedPullRequestDisposition>,
}

impl PullRequestEvent {
    /// Creates an event for the pull request at `url`.
    #[must_use]
    pub const fn new(url: PullRequestUrl, status: PullRequestStatus) -> Self {
        Self {
            url,
            status,
            closed_disposition: None,
        }
    }

    /// Chooses where a task goes when its pull request is closed unmerged.
    ///
    /// Without an explicit choice the configured default applies.
    #[must_use]
    pub const fn with_closed_disposition(
        mut self,
        disposition: ClosedPullRequestDisposition,
    ) -> Self {
        self.closed_disposition = Some(disposition);
        self
    }

    /// Returns the pull request URL.
    #[must_use]
    pub const fn url(&self) -> &PullRequestUrl {
        &self.url
    }

    /// Returns the reported pull request status.
    #[must_use]
    pub const fn status(&self) -> PullRequestStatus {
        self.status
    }

    /// Returns the caller's disposition for closed pull requests, if any.
    #[must_use]
    pub const fn closed_disposition(&self) -> Option<ClosedPullRequestDisposition> {
        self.closed_disposition
    }
}
