//! In-memory context adapters.

mod references;
mod store;

pub use references::InMemoryContextReferenceRepository;
pub use store::InMemoryContextStore;
