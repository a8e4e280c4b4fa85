//! Run type, run status, and pull request status enumerations.

use super::{ParsePullRequestStatusError, ParseRunStatusError, ParseRunTypeError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of work an agent run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    /// Produces a textual implementation plan without touching source code.
    Planning,
    /// Modifies the linked repository and may open a pull request.
    Implementation,
}

impl RunType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Implementation => "implementation",
        }
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RunType {
    type Error = ParseRunTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "planning" => Ok(Self::Planning),
            "implementation" => Ok(Self::Implementation),
            _ => Err(ParseRunTypeError(value.to_owned())),
        }
    }
}

/// Lifecycle status of an agent run.
///
/// Status only ever moves forward: `Creating` → `Running` →
/// {`Finished` | `Failed`}. `Creating` may jump straight to a terminal
/// status when the runner reports completion before any progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run record exists and is being dispatched to the runner.
    Creating,
    /// The runner has accepted the run and reports progress.
    Running,
    /// The runner completed the run.
    Finished,
    /// The run failed, was abandoned, or was expired by the watchdog.
    Failed,
}

impl RunStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for `Finished` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Creating => 0,
            Self::Running => 1,
            Self::Finished | Self::Failed => 2,
        }
    }

    /// Returns whether a run in this status may move to `target`.
    #[must_use]
    pub const fn can_advance_to(self, target: Self) -> bool {
        self.rank() < target.rank()
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RunStatus {
    type Error = ParseRunStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "creating" => Ok(Self::Creating),
            "running" => Ok(Self::Running),
            "finished" => Ok(Self::Finished),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseRunStatusError(value.to_owned())),
        }
    }
}

/// Status of a pull request opened by an implementation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestStatus {
    /// The pull request is open for review.
    Open,
    /// The pull request was merged.
    Merged,
    /// The pull request was closed without merging.
    Closed,
}

impl PullRequestStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Merged => "merged",
            Self::Closed => "closed",
        }
    }

    /// Returns whether a pull request in this status may move to `target`.
    ///
    /// Merged pull requests are final; closed pull requests may be reopened
    /// or merged only after reopening.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::Merged | Self::Closed) | (Self::Closed, Self::Open)
        )
    }
}

impl fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PullRequestStatus {
    type Error = ParsePullRequestStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "open" => Ok(Self::Open),
            "merged" => Ok(Self::Merged),
            "closed" => Ok(Self::Closed),
            _ => Err(ParsePullRequestStatusError(value.to_owned())),
        }
    }
}
