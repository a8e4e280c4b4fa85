//! Port contracts for task lifecycle management.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod comments;
pub mod repository;
pub mod repository_links;

pub use comments::{CommentRepository, CommentRepositoryError, CommentRepositoryResult};
pub use repository::{TaskRepository, TaskRepositoryError, TaskRepositoryResult};
pub use repository_links::{RepositoryLinkError, RepositoryLinkResolver};
