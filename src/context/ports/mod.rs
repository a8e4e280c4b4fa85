//! Port contracts for context assembly.

pub mod references;
pub mod store;

pub use references::{
    ContextReferenceRepository, ContextReferenceRepositoryError, ContextReferenceRepositoryResult,
};
pub use store::{ContextStore, ContextStoreError, ContextStoreResult};
