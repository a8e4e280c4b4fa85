//! Task comments and agent mention detection.

use super::{CommentId, TaskDomainError, TaskId, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Token that directs a comment at the agent, such as `@agent`.
///
/// Matching is ASCII case-insensitive and only counts occurrences that are
/// not embedded in a longer word, so `hey @Agent, retry` matches while
/// `mail@agents.dev` does not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentMention(String);

impl AgentMention {
    /// Creates a validated mention token.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidAgentMention`] when the token is
    /// blank or contains whitespace.
    pub fn new(token: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = token.into();
        let normalized = raw.trim();
        if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
            return Err(TaskDomainError::InvalidAgentMention(raw));
        }
        Ok(Self(normalized.to_ascii_lowercase()))
    }

    /// Returns the normalised token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether `body` contains the token as a standalone word.
    #[must_use]
    pub fn is_mentioned_in(&self, body: &str) -> bool {
        let lowered = body.to_ascii_lowercase();
        lowered.match_indices(self.0.as_str()).any(|(index, _)| {
            let before = lowered
                .get(..index)
                .and_then(|prefix| prefix.chars().next_back());
            let after = lowered
                .get(index.saturating_add(self.0.len())..)
                .and_then(|suffix| suffix.chars().next());
            !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
        })
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '@'
}

/// Author of a task comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CommentAuthor {
    /// A human workspace member.
    User(UserId),
    /// The coding agent itself.
    Agent,
}

/// Append-only message on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    id: CommentId,
    task_id: TaskId,
    author: CommentAuthor,
    body: String,
    mentions_agent: bool,
    created_at: DateTime<Utc>,
}

impl Comment {
    /// Creates a comment, flagging it when the body mentions the agent.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyCommentBody`] when the body is blank.
    pub fn new(
        task_id: TaskId,
        author: CommentAuthor,
        body: impl Into<String>,
        mention: &AgentMention,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        let raw = body.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TaskDomainError::EmptyCommentBody);
        }
        Ok(Self {
            id: CommentId::new(),
            task_id,
            author,
            mentions_agent: mention.is_mentioned_in(trimmed),
            body: trimmed.to_owned(),
            created_at: clock.utc(),
        })
    }

    /// Returns the comment identifier.
    #[must_use]
    pub const fn id(&self) -> CommentId {
        self.id
    }

    /// Returns the owning task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the comment author.
    #[must_use]
    pub const fn author(&self) -> &CommentAuthor {
        &self.author
    }

    /// Returns the comment body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns `true` when the body contains the agent mention token.
    #[must_use]
    pub const fn mentions_agent(&self) -> bool {
        self.mentions_agent
    }

    /// Returns `true` when a human wrote the comment and it mentions the
    /// agent.
    #[must_use]
    pub const fn requests_agent_work(&self) -> bool {
        self.mentions_agent && matches!(self.author, CommentAuthor::User(_))
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
