//! Application services for context assembly.

mod assembly;
mod prompt;

pub use assembly::{ContextAssemblyService, ContextError, ContextResult, PreparedPrompt};
