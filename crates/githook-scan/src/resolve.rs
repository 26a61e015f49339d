//! Commit verification and counting.

use githook_utils::{GitCommand, StdioMode};
use tracing::debug;

use crate::oid::is_null_revision;
use crate::repo::Repo;
use crate::{Result, ScanError};

/// Whether `rev` names an existing commit.
///
/// Never fails: empty input, option-like input, unknown revisions and
/// revisions naming non-commit objects all answer `false`, as does a git
/// program that cannot be run.
pub fn verify_commit(repo: &Repo, rev: &str) -> bool {
    let rev = rev.trim();
    if rev.is_empty() || rev.starts_with('-') {
        return false;
    }
    repo.git()
        .args(["rev-parse", "--verify", "--quiet"])
        .arg(format!("{}^{{commit}}", rev))
        .stdout(StdioMode::Null)
        .stderr(StdioMode::Null)
        .run()
        .map(|result| result.success())
        .unwrap_or(false)
}

/// Number of commits reachable from `new_rev` but not from `old_rev`.
///
/// When `old_rev` is the null id the push creates a branch, and the count
/// is instead the commits reachable from `new_rev` that no existing ref
/// reaches.
pub fn count_commits(repo: &Repo, new_rev: &str, old_rev: &str) -> Result<u64> {
    let (new_rev, old_rev) = (new_rev.trim(), old_rev.trim());
    if let Some(rev) = [new_rev, old_rev].into_iter().find(|rev| rev.starts_with('-')) {
        return Err(ScanError::Resolution {
            command: "rev-list --count".to_string(),
            reason: format!("refusing option-like revision '{}'", rev),
        });
    }
    let cmd = if is_null_revision(old_rev) {
        repo.git()
            .args(["rev-list", "--count", new_rev, "--not", "--all"])
    } else {
        repo.git()
            .args(["rev-list", "--count"])
            .arg(format!("{}..{}", old_rev, new_rev))
    };
    let command = cmd.command_string();
    let stdout = run_query(&cmd)?;

    let stdout = String::from_utf8_lossy(&stdout).trim().to_string();
    let count = stdout.parse::<u64>().map_err(|_| ScanError::Resolution {
        command: command.clone(),
        reason: format!("unparseable commit count '{}'", stdout),
    })?;
    debug!(%command, count, "counted commits");
    Ok(count)
}

/// Run a read-only query and return its stdout. Failing to start and
/// exiting non-zero are both [`ScanError::Resolution`].
pub(crate) fn run_query(cmd: &GitCommand) -> Result<Vec<u8>> {
    let command = cmd.command_string();
    let result = cmd.run().map_err(|e| ScanError::Resolution {
        command: command.clone(),
        reason: e.to_string(),
    })?;
    if !result.success() {
        return Err(ScanError::Resolution {
            command,
            reason: result.stderr_trimmed(),
        });
    }
    Ok(result.stdout)
}
