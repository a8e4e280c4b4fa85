//! Error types for context reference validation and parsing.

use thiserror::Error;

/// Errors returned while constructing context values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContextDomainError {
    /// The referenced item identifier is blank.
    #[error("context reference identifier must not be empty")]
    EmptyRefId,

    /// Relevance scores must be finite and within `0.0..=1.0`.
    #[error("relevance score {0} is outside 0.0..=1.0")]
    InvalidRelevanceScore(f64),
}

/// Error returned when parsing a context reference type fails.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown context reference type: {0}")]
pub struct ParseContextRefTypeError(pub String);
