//! Lifecycle policy configuration.
//!
//! Defaults suit most workspaces; [`LifecycleConfig::from_env`] overlays
//! `TASKLANE_*` environment variables on them.

use crate::task::domain::{AgentMention, ClosedPullRequestDisposition, NoChangesPolicy};
use chrono::TimeDelta;
use serde::Deserialize;
use thiserror::Error;

const NO_CHANGES_POLICY: &str = "TASKLANE_NO_CHANGES_POLICY";
const CLOSED_PR_DISPOSITION: &str = "TASKLANE_CLOSED_PR_DISPOSITION";
const MAX_RUN_DURATION_SECS: &str = "TASKLANE_MAX_RUN_DURATION_SECS";
const AGENT_MENTION: &str = "TASKLANE_AGENT_MENTION";
const SUGGESTION_LIMIT: &str = "TASKLANE_SUGGESTION_LIMIT";
const MIN_RELEVANCE: &str = "TASKLANE_MIN_RELEVANCE";
const PLAN_ON_CREATE: &str = "TASKLANE_PLAN_ON_CREATE";

/// Policy knobs for the task lifecycle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Where a task goes when its implementation run finished without a pull
    /// request.
    pub no_changes_policy: NoChangesPolicy,
    /// Where a task goes when its pull request closed unmerged and the event
    /// names no disposition.
    pub closed_pull_request: ClosedPullRequestDisposition,
    /// Age after which an active run is force-failed by the watchdog.
    pub max_run_duration_secs: u64,
    /// Comment token that directs work at the agent.
    pub agent_mention: String,
    /// Maximum number of automatic context suggestions.
    pub suggestion_limit: usize,
    /// Suggestions scoring below this are dropped.
    pub min_relevance: f64,
    /// Request a planning run as soon as an agent-assigned task is created.
    pub plan_on_create: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            no_changes_policy: NoChangesPolicy::default(),
            closed_pull_request: ClosedPullRequestDisposition::default(),
            max_run_duration_secs: 3600,
            agent_mention: "@agent".to_owned(),
            suggestion_limit: 8,
            min_relevance: 0.0,
            plan_on_create: false,
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable held a value that could not be parsed.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Offending variable.
        key: String,
        /// What was wrong with it.
        message: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_owned(),
            message: message.into(),
        }
    }
}

impl LifecycleConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a set variable cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a present value cannot be
    /// parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(NO_CHANGES_POLICY) {
            config.no_changes_policy = NoChangesPolicy::try_from(raw.as_str())
                .map_err(|message| ConfigError::invalid(NO_CHANGES_POLICY, message))?;
        }
        if let Some(raw) = lookup(CLOSED_PR_DISPOSITION) {
            config.closed_pull_request = ClosedPullRequestDisposition::try_from(raw.as_str())
                .map_err(|message| ConfigError::invalid(CLOSED_PR_DISPOSITION, message))?;
        }
        if let Some(raw) = lookup(MAX_RUN_DURATION_SECS) {
            config.max_run_duration_secs = parse_number(MAX_RUN_DURATION_SECS, &raw)?;
        }
        if let Some(raw) = lookup(AGENT_MENTION) {
            AgentMention::new(raw.as_str())
                .map_err(|err| ConfigError::invalid(AGENT_MENTION, err.to_string()))?;
            config.agent_mention = raw;
        }
        if let Some(raw) = lookup(SUGGESTION_LIMIT) {
            config.suggestion_limit = parse_number(SUGGESTION_LIMIT, &raw)?;
        }
        if let Some(raw) = lookup(MIN_RELEVANCE) {
            let value: f64 = parse_number(MIN_RELEVANCE, &raw)?;
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(MIN_RELEVANCE, "expected 0.0..=1.0"));
            }
            config.min_relevance = value;
        }
        if let Some(raw) = lookup(PLAN_ON_CREATE) {
            config.plan_on_create = parse_flag(PLAN_ON_CREATE, &raw)?;
        }

        Ok(config)
    }

    /// Returns the watchdog threshold as a duration.
    #[must_use]
    pub fn max_run_duration(&self) -> TimeDelta {
        i64::try_from(self.max_run_duration_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    /// Returns the validated agent mention token.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when the token is blank or
    /// contains whitespace.
    pub fn mention(&self) -> Result<AgentMention, ConfigError> {
        AgentMention::new(self.agent_mention.as_str())
            .map_err(|err| ConfigError::invalid(AGENT_MENTION, err.to_string()))
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|err| ConfigError::invalid(key, err.to_string()))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, format!("expected a boolean, got '{raw}'"))),
    }
}
