//! In-memory adapters for tasks, comments, and repository links.

mod comments;
mod repository_links;
mod task;

pub use comments::InMemoryCommentRepository;
pub use repository_links::StaticRepositoryLinks;
pub use task::InMemoryTaskRepository;
