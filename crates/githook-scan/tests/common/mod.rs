//! Repository fixtures shared by the githook-scan integration tests.
//!
//! Every git invocation runs with a pinned environment so commit ids are
//! stable across machines.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn pin_env(cmd: &mut Command, dir: &Path) {
    cmd.env("GIT_AUTHOR_NAME", "Test Author")
        .env("GIT_AUTHOR_EMAIL", "author@test.com")
        .env("GIT_AUTHOR_DATE", "1700000000 +0000")
        .env("GIT_COMMITTER_NAME", "Test Committer")
        .env("GIT_COMMITTER_EMAIL", "committer@test.com")
        .env("GIT_COMMITTER_DATE", "1700000000 +0000")
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("HOME", dir)
        .env("LC_ALL", "C");
}

/// Run git in `dir` and return trimmed stdout, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(dir);
    pin_env(&mut cmd, dir);
    let output = cmd.output().expect("failed to run git");
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("git {:?} failed: {}", args, stderr);
    }
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

/// Write `contents` to `name` and commit it.
pub fn commit_file(dir: &Path, name: &str, contents: &[u8], message: &str) -> String {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    git(dir, &["add", name]);
    git(dir, &["commit", "-q", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

/// Distinct filler content of exactly `len` bytes.
pub fn filler(tag: &str, len: usize) -> Vec<u8> {
    let mut data = tag.as_bytes().to_vec();
    data.resize(len, b'.');
    data
}

/// A repository with five commits on `main`:
///
/// 1. `base.txt` (1500 bytes)
/// 2. `assets/big.bin` (3072 bytes) and `small1.txt`
/// 3. `small2.txt`
/// 4. `small3.txt`
/// 5. `docs/small 4.txt` and `small5.txt`
///
/// Small files are under 100 bytes and all contents differ.
pub struct Fixture {
    pub dir: TempDir,
    pub commits: Vec<String>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path();
        git(path, &["init", "-q", "-b", "main"]);
        git(path, &["config", "user.name", "Test"]);
        git(path, &["config", "user.email", "test@test.com"]);

        let mut commits = Vec::new();
        commits.push(commit_file(path, "base.txt", &filler("base", 1500), "base"));

        std::fs::create_dir_all(path.join("assets")).unwrap();
        std::fs::write(path.join("assets/big.bin"), filler("big", 3072)).unwrap();
        std::fs::write(path.join("small1.txt"), b"small one\n").unwrap();
        git(path, &["add", "assets/big.bin", "small1.txt"]);
        git(path, &["commit", "-q", "-m", "big"]);
        commits.push(git(path, &["rev-parse", "HEAD"]));

        commits.push(commit_file(path, "small2.txt", b"small two\n", "two"));
        commits.push(commit_file(path, "small3.txt", b"small three\n", "three"));

        std::fs::create_dir_all(path.join("docs")).unwrap();
        std::fs::write(path.join("docs/small 4.txt"), b"small four\n").unwrap();
        std::fs::write(path.join("small5.txt"), b"small five\n").unwrap();
        git(path, &["add", "docs/small 4.txt", "small5.txt"]);
        git(path, &["commit", "-q", "-m", "four and five"]);
        commits.push(git(path, &["rev-parse", "HEAD"]));

        Self { dir, commits }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn repo(&self) -> githook_scan::Repo {
        githook_scan::Repo::open(self.path())
    }

    pub fn first(&self) -> &str {
        &self.commits[0]
    }

    pub fn head(&self) -> &str {
        &self.commits[4]
    }

    /// A commit no ref points at, built on `parent` (or parentless).
    pub fn dangling_commit(&self, parent: Option<&str>, message: &str) -> String {
        let tree = git(self.path(), &["rev-parse", "HEAD^{tree}"]);
        let mut args = vec!["commit-tree", tree.as_str(), "-m", message];
        if let Some(parent) = parent {
            args.push("-p");
            args.push(parent);
        }
        git(self.path(), &args)
    }
}
