use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use githook_utils::GitCommand;

use crate::{Result, ScanError};

/// Handle on the repository being inspected.
///
/// Holds no git state of its own: every query runs the configured git
/// program inside `dir`, so `GIT_DIR` and friends inherited from the hook
/// environment are honored.
#[derive(Debug, Clone)]
pub struct Repo {
    dir: PathBuf,
    program: OsString,
}

impl Repo {
    /// Use `dir` without checking that it is a repository.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            program: OsString::from("git"),
        }
    }

    /// Use `dir`, failing if git does not recognize it as a repository.
    pub fn discover(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir).ensure_repository()
    }

    /// Check with the configured git program that `dir` is a repository.
    pub fn ensure_repository(self) -> Result<Self> {
        let result = self.git().args(["rev-parse", "--git-dir"]).run()?;
        if !result.success() {
            return Err(ScanError::NotARepository(self.dir));
        }
        Ok(self)
    }

    /// Replace the git executable (defaults to `git` on `PATH`).
    pub fn with_program(mut self, program: impl AsRef<OsStr>) -> Self {
        self.program = program.as_ref().to_os_string();
        self
    }

    /// The directory queries run in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A command builder for the configured git program, rooted at the
    /// repository directory with stdout and stderr captured.
    pub fn git(&self) -> GitCommand {
        GitCommand::new(&self.program).working_dir(&self.dir)
    }
}
