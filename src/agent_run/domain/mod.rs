//! Domain model for agent runs.
//!
//! An agent run is one dispatch of a planning or implementation pass to the
//! external coding-agent service. Runs move monotonically from `creating`
//! to a terminal status and are retained as history after they finish.

mod error;
mod ids;
mod pull_request;
mod report;
mod run;
mod status;

pub use error::{
    AgentRunDomainError, ParsePullRequestStatusError, ParseRunStatusError, ParseRunTypeError,
};
pub use ids::{AgentRunId, ExternalRunId};
pub use pull_request::{PullRequest, PullRequestNumber, PullRequestUrl};
pub use report::{PullRequestEvent, ReportDigest, RunStatusReport};
pub use run::{
    ABANDONED_MESSAGE, AgentRun, IgnoredReport, PersistedAgentRunData, PullRequestChange,
    ReportDisposition, RunTransition,
};
pub use status::{PullRequestStatus, RunStatus, RunType};
