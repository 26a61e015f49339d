//! Shared test harness for githook integration tests.
//!
//! Provides process runners and repo setup utilities. Each test gets its own
//! home directory so the user's real `~/.githook_config` never leaks in.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

pub const NULL_REV: &str = "0000000000000000000000000000000000000000";

/// Captured output from running a command.
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Discover the path to the compiled `githook` binary.
pub fn githook_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_githook"))
}

/// Apply the pinned environment variables to a `Command`.
fn pin_env(cmd: &mut Command, home: &Path) {
    cmd.env("GIT_AUTHOR_NAME", "Test Author")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_AUTHOR_DATE", "1234567890 +0000")
        .env("GIT_COMMITTER_NAME", "Test Committer")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_DATE", "1234567890 +0000")
        .env("TZ", "UTC")
        .env("LC_ALL", "C")
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("HOME", home)
        .env_remove("USERPROFILE")
        .env_remove("GITHOOK_FILE_SIZE_MAX")
        .env_remove("GITHOOK_LOG_LEVEL")
        .env_remove("GITHOOK_LOG_OUTPUT")
        .env_remove("GITHOOK_GIT");
}

fn capture(cmd: &mut Command) -> CommandResult {
    let output = cmd.output().expect("failed to run command");
    CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(128),
    }
}

/// A throwaway repository plus an isolated home directory.
pub struct HookEnv {
    pub home: TempDir,
    pub repo: TempDir,
}

impl HookEnv {
    pub fn new() -> Self {
        let env = Self {
            home: tempfile::tempdir().unwrap(),
            repo: tempfile::tempdir().unwrap(),
        };
        env.git_ok(&["init", "-q", "-b", "main"]);
        env.git_ok(&["config", "user.name", "Test"]);
        env.git_ok(&["config", "user.email", "test@test.com"]);
        env
    }

    pub fn repo_path(&self) -> &Path {
        self.repo.path()
    }

    /// Write `~/.githook_config`.
    pub fn write_config(&self, yaml: &str) {
        std::fs::write(self.home.path().join(".githook_config"), yaml).unwrap();
    }

    pub fn git(&self, args: &[&str]) -> CommandResult {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(self.repo_path());
        pin_env(&mut cmd, self.home.path());
        capture(&mut cmd)
    }

    /// Run git and return trimmed stdout, panicking on failure.
    pub fn git_ok(&self, args: &[&str]) -> String {
        let result = self.git(args);
        assert_eq!(result.exit_code, 0, "git {:?} failed: {}", args, result.stderr);
        result.stdout.trim().to_string()
    }

    /// Commit a file of `size` bytes and return the new HEAD.
    pub fn commit_sized(&self, name: &str, size: usize) -> String {
        let path = self.repo_path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut data = name.as_bytes().to_vec();
        data.resize(size.max(data.len()), b'x');
        data.truncate(size);
        std::fs::write(&path, data).unwrap();
        self.git_ok(&["add", name]);
        self.git_ok(&["commit", "-q", "-m", name]);
        self.git_ok(&["rev-parse", "HEAD"])
    }

    /// Run `githook <subcommand> --project <project> --oldrev .. --newrev ..`.
    pub fn hook(&self, subcommand: &str, project: &str, old: &str, new: &str, extra: &[&str]) -> CommandResult {
        self.hook_with_env(subcommand, project, old, new, extra, &[])
    }

    pub fn hook_with_env(
        &self,
        subcommand: &str,
        project: &str,
        old: &str,
        new: &str,
        extra: &[&str],
        vars: &[(&str, &str)],
    ) -> CommandResult {
        let mut cmd = Command::new(githook_bin());
        cmd.arg(subcommand)
            .args(["--project", project])
            .args(["--uploader", "Test Author <test@example.com>"])
            .args(["--uploader-username", "tester"])
            .args(["--oldrev", old])
            .args(["--newrev", new])
            .args(["--refname", "refs/heads/main"])
            .args(extra)
            .current_dir(self.repo_path());
        pin_env(&mut cmd, self.home.path());
        for (k, v) in vars {
            cmd.env(k, v);
        }
        capture(&mut cmd)
    }
}
