use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

use githook_utils::UtilError;

use crate::details::GroupFailure;

/// Which revision of a request failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitSide {
    /// The lone commit of a single-commit listing.
    Commit,
    /// The excluded side of a span.
    Start,
    /// The included side of a span.
    End,
}

impl fmt::Display for CommitSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommitSide::Commit => "commit",
            CommitSide::Start => "start commit",
            CommitSide::End => "end commit",
        })
    }
}

/// Errors produced while planning or running a scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("invalid {side}: '{rev}'")]
    InvalidCommit { side: CommitSide, rev: String },

    #[error("unable to count commits with '{command}': {reason}")]
    Resolution { command: String, reason: String },

    #[error("git invocation failed: {0}")]
    ToolInvocation(#[from] UtilError),

    #[error("object listing '{command}' failed ({status}): {stderr}")]
    Listing {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("invalid commit range: {0}")]
    InvalidRange(String),

    #[error("invalid object id: '{0}'")]
    InvalidObjectId(String),

    #[error("not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("{0}")]
    GroupFailed(GroupFailure),
}
