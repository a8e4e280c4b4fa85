//! Ranked context suggestions and assembled context items.

use super::{ContextDomainError, ContextKey};
use crate::task::domain::WorkspaceId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Relevance of a candidate item, in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct RelevanceScore(f64);

impl RelevanceScore {
    /// Creates a validated score.
    ///
    /// # Errors
    ///
    /// Returns [`ContextDomainError::InvalidRelevanceScore`] for non-finite
    /// values or values outside `0.0..=1.0`.
    pub fn new(value: f64) -> Result<Self, ContextDomainError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ContextDomainError::InvalidRelevanceScore(value));
        }
        Ok(Self(value))
    }

    /// Returns the score value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Orders scores from most to least relevant.
    #[must_use]
    pub fn descending(self, other: Self) -> Ordering {
        other.0.total_cmp(&self.0)
    }
}

impl TryFrom<f64> for RelevanceScore {
    type Error = ContextDomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RelevanceScore> for f64 {
    fn from(score: RelevanceScore) -> Self {
        score.0
    }
}

/// Candidate item proposed by the ranking collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSuggestion {
    /// `(refType, refId)` of the candidate.
    pub key: ContextKey,
    /// Display title of the candidate.
    pub title: String,
    /// Relevance against the task title.
    pub relevance_score: RelevanceScore,
    /// Why the ranker proposed the item.
    pub reason: Option<String>,
}

/// What the ranking collaborator is asked about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextQuery {
    /// Workspace whose pool is searched.
    pub workspace_id: WorkspaceId,
    /// Task title; the primary ranking signal.
    pub title: String,
    /// Task description, if any.
    pub description: Option<String>,
}

/// Body of a workspace item, fetched for prompt rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDocument {
    /// `(refType, refId)` of the item.
    pub key: ContextKey,
    /// Display title.
    pub title: String,
    /// Full text.
    pub body: String,
}

/// One entry of the assembled context handed to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    /// `(refType, refId)` of the item.
    pub key: ContextKey,
    /// Display title.
    pub title: String,
    /// Ranking score; `None` for pinned references that were not ranked.
    pub relevance_score: Option<RelevanceScore>,
    /// Ranking reason, when ranked.
    pub reason: Option<String>,
    /// `true` when the item comes from a stored context reference.
    pub pinned: bool,
}

impl ContextItem {
    /// Builds an unranked item for a stored reference.
    #[must_use]
    pub const fn pinned(key: ContextKey, title: String) -> Self {
        Self {
            key,
            title,
            relevance_score: None,
            reason: None,
            pinned: true,
        }
    }
}

impl From<ContextSuggestion> for ContextItem {
    fn from(suggestion: ContextSuggestion) -> Self {
        Self {
            key: suggestion.key,
            title: suggestion.title,
            relevance_score: Some(suggestion.relevance_score),
            reason: suggestion.reason,
            pinned: false,
        }
    }
}
