//! Domain model for task context.
//!
//! A task's context is the set of workspace documents, messages, and links
//! attached to its agent prompt. Users pin items explicitly; a ranking
//! collaborator proposes the rest.

mod error;
mod reference;
mod suggestion;

pub use error::{ContextDomainError, ParseContextRefTypeError};
pub use reference::{ContextKey, ContextRefId, ContextRefType, ContextReference, ReferenceOrigin};
pub use suggestion::{
    ContextDocument, ContextItem, ContextQuery, ContextSuggestion, RelevanceScore,
};
