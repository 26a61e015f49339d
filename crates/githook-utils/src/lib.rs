//! Foundation utilities for the githook crates: a subprocess builder for
//! invoking git plumbing, and human-readable size formatting.

pub mod error;
pub mod size;
pub mod subprocess;

pub use error::UtilError;
pub use size::format_size;
pub use subprocess::{GitCommand, GitCommandResult, StdioMode};

pub type Result<T> = std::result::Result<T, UtilError>;
