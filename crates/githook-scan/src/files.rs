//! Per-commit file queries: which files a commit touched, and how large a
//! file is at a given commit.

use bstr::{BString, ByteSlice};
use githook_utils::format_size;
use tracing::debug;

use crate::repo::Repo;
use crate::resolve::{run_query, verify_commit};
use crate::{CommitSide, Result, ScanError};

/// Change kinds that leave a file present after the commit: added, copied,
/// modified, renamed, type-changed, unmerged, unknown and broken pairs.
const PRESENT_AFTER: &str = "--diff-filter=ACMRTUXB";

fn checked_commit<'a>(repo: &Repo, commit: &'a str) -> Result<&'a str> {
    let commit = commit.trim();
    if verify_commit(repo, commit) {
        Ok(commit)
    } else {
        Err(ScanError::InvalidCommit {
            side: CommitSide::Commit,
            rev: commit.to_string(),
        })
    }
}

/// Paths `commit` adds or changes relative to its first parent, deletions
/// excluded. A root commit lists every file it contains.
pub fn files_in_commit(repo: &Repo, commit: &str) -> Result<Vec<BString>> {
    let commit = checked_commit(repo, commit)?;
    let cmd = repo
        .git()
        .args(["diff-tree", "--no-commit-id", "--name-only", PRESENT_AFTER])
        .args(["-r", "-z", "--root", commit]);
    let stdout = run_query(&cmd)?;
    let files: Vec<BString> = stdout
        .split_str("\0")
        .filter(|name| !name.is_empty())
        .map(BString::from)
        .collect();
    debug!(commit, files = files.len(), "listed changed files");
    Ok(files)
}

/// Size in bytes of the blob at `path` in `commit`.
///
/// `path` is taken from the top of the tree. `None` when nothing is at that
/// path, or when what is there is not a blob (a directory or submodule).
pub fn file_size(repo: &Repo, commit: &str, path: &str) -> Result<Option<u64>> {
    let commit = checked_commit(repo, commit)?;
    let cmd = repo
        .git()
        .args(["ls-tree", "-l", "-z", "--full-tree", commit, "--", path]);
    let stdout = run_query(&cmd)?;
    let Some(entry) = stdout.split_str("\0").find(|entry| !entry.is_empty()) else {
        return Ok(None);
    };
    parse_ls_tree_entry(entry).map_err(|reason| ScanError::Resolution {
        command: cmd.command_string(),
        reason,
    })
}

/// [`file_size`] rendered with [`format_size`].
pub fn formatted_file_size(repo: &Repo, commit: &str, path: &str) -> Result<Option<String>> {
    Ok(file_size(repo, commit, path)?.map(format_size))
}

/// `<mode> SP <type> SP <object> SP+ <size> TAB <path>`; the size column is
/// `-` for anything but a blob.
fn parse_ls_tree_entry(entry: &[u8]) -> std::result::Result<Option<u64>, String> {
    let meta = match entry.find_byte(b'\t') {
        Some(tab) => &entry[..tab],
        None => entry,
    };
    let fields: Vec<&[u8]> = meta.fields().collect();
    let &[_mode, kind, _id, size] = fields.as_slice() else {
        return Err(format!("unexpected ls-tree entry '{}'", entry.as_bstr()));
    };
    if kind != b"blob" {
        return Ok(None);
    }
    size.to_str()
        .ok()
        .and_then(|size| size.parse::<u64>().ok())
        .map(Some)
        .ok_or_else(|| format!("unparseable size in ls-tree entry '{}'", entry.as_bstr()))
}
