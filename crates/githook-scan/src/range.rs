//! What a ref update asks to be scanned, and how.

use std::fmt;

use crate::oid::is_null_revision;
use crate::{Result, ScanError};

/// A ref update as a hook sees it, with the null-id sentinels turned into
/// explicit states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitRange {
    /// A new ref pointing at `new`.
    Create { new: String },
    /// An existing ref moving from `old` to `new`.
    Update { old: String, new: String },
    /// A ref being removed; nothing new enters the repository.
    Delete { old: String },
}

impl CommitRange {
    /// Build a range from the raw `(oldrev, newrev)` pair of a hook.
    ///
    /// A null id of either width on one side selects `Create` or `Delete`.
    /// Both sides null, or either side empty, is rejected.
    pub fn from_revisions(old: &str, new: &str) -> Result<Self> {
        let (old, new) = (old.trim(), new.trim());
        if old.is_empty() || new.is_empty() {
            return Err(ScanError::InvalidRange(format!(
                "empty revision in '{}' -> '{}'",
                old, new
            )));
        }
        match (is_null_revision(old), is_null_revision(new)) {
            (true, true) => Err(ScanError::InvalidRange(
                "both old and new revisions are null".to_string(),
            )),
            (true, false) => Ok(CommitRange::Create {
                new: new.to_string(),
            }),
            (false, true) => Ok(CommitRange::Delete {
                old: old.to_string(),
            }),
            (false, false) => Ok(CommitRange::Update {
                old: old.to_string(),
                new: new.to_string(),
            }),
        }
    }

    /// The revision the ref ends up at, if any.
    pub fn new_rev(&self) -> Option<&str> {
        match self {
            CommitRange::Create { new } | CommitRange::Update { new, .. } => Some(new),
            CommitRange::Delete { .. } => None,
        }
    }
}

impl fmt::Display for CommitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitRange::Create { new } => write!(f, "create {}", new),
            CommitRange::Update { old, new } => write!(f, "{}..{}", old, new),
            CommitRange::Delete { old } => write!(f, "delete {}", old),
        }
    }
}

/// How the objects of a range are enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPlan {
    /// Objects reachable from `end` but not from `start`.
    Span { start: String, end: String },
    /// Every object reachable from `commit`.
    Single { commit: String },
    /// Nothing to scan.
    Nothing,
}
