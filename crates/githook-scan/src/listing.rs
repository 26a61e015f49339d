//! Object enumeration: stream the objects a commit or span introduces.
//!
//! Listings are produced by a `git rev-list --objects` child process whose
//! stdout is read line by line on a dedicated thread and handed to the
//! consumer through a rendezvous channel, so at most one listed object is in
//! flight between the reader and whoever drains the stream.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::process::Child;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use bstr::{BString, ByteSlice};
use crossbeam::channel::{bounded, Receiver, Sender};
use githook_utils::GitCommand;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::repo::Repo;
use crate::resolve::verify_commit;
use crate::{CommitSide, Result, ScanError};

/// Bytes of listing stderr kept for error reports.
const STDERR_TAIL: usize = 16 * 1024;

/// One line of an object listing: an identifier and, for objects found
/// through a tree, the path it was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedObject {
    pub id: String,
    pub path: Option<BString>,
}

impl ListedObject {
    pub fn new(id: impl Into<String>, path: Option<BString>) -> Self {
        Self {
            id: id.into(),
            path,
        }
    }

    /// Parse a listing line: the first whitespace-delimited token is the
    /// identifier, everything after the delimiter is the path (spaces
    /// included). Blank lines yield `None`.
    pub fn parse_line(line: &[u8]) -> Option<Self> {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let line = line.trim_start();
        if line.is_empty() {
            return None;
        }
        let (id, path) = match line.find_byteset(b" \t") {
            Some(pos) => (&line[..pos], &line[pos + 1..]),
            None => (line, &b""[..]),
        };
        let path = (!path.is_empty()).then(|| BString::from(path));
        Some(Self {
            id: id.to_str_lossy().into_owned(),
            path,
        })
    }

    /// Append the line sent to `cat-file --batch-check` for this object.
    pub fn write_batch_line(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.id.as_bytes());
        if let Some(path) = &self.path {
            buf.push(b' ');
            buf.extend_from_slice(path);
        }
        buf.push(b'\n');
    }

    fn without_path(mut self) -> Self {
        self.path = None;
        self
    }
}

impl fmt::Display for ListedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} {}", self.id, path),
            None => f.write_str(&self.id),
        }
    }
}

impl FromStr for ListedObject {
    type Err = ScanError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse_line(s.as_bytes()).ok_or_else(|| ScanError::InvalidObjectId(s.to_string()))
    }
}

/// A lazily produced, single-pass listing of objects.
///
/// Dropping the stream cancels it: the reader thread stops, the listing
/// process is killed and reaped.
pub struct ObjectStream {
    rx: Option<Receiver<Result<ListedObject>>>,
    cancel: CancelToken,
    child: Option<Arc<Mutex<Child>>>,
    reader: Option<JoinHandle<()>>,
}

impl ObjectStream {
    /// A stream that yields nothing.
    pub fn empty() -> Self {
        Self {
            rx: None,
            cancel: CancelToken::new(),
            child: None,
            reader: None,
        }
    }

    /// The token that cancels this stream.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn shutdown(&mut self) {
        // An exhausted stream ended on its own; cancelling it then would
        // also cancel the stages downstream that share the token.
        if self.rx.is_some() {
            self.cancel.cancel();
            if let Some(child) = &self.child {
                let _ = child.lock().unwrap_or_else(PoisonError::into_inner).kill();
            }
        }
        self.child = None;
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        self.rx = None;
    }
}

impl Iterator for ObjectStream {
    type Item = Result<ListedObject>;

    fn next(&mut self) -> Option<Self::Item> {
        let rx = self.rx.as_ref()?;
        let item = self.cancel.recv(rx);
        if item.is_none() {
            self.rx = None;
        }
        item
    }
}

impl Drop for ObjectStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ObjectStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStream")
            .field("live", &self.rx.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Builds object listings against one repository.
#[derive(Debug, Clone)]
pub struct Enumerator {
    repo: Repo,
    cancel: CancelToken,
}

impl Enumerator {
    pub fn new(repo: Repo) -> Self {
        Self {
            repo,
            cancel: CancelToken::new(),
        }
    }

    /// Share a cancellation token with the rest of a pipeline.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Every object reachable from `commit`: the commits of its history,
    /// their trees and the blobs within them.
    pub fn single_commit(&self, commit: &str, include_path: bool) -> Result<ObjectStream> {
        let commit = commit.trim();
        if !verify_commit(&self.repo, commit) {
            return Err(ScanError::InvalidCommit {
                side: CommitSide::Commit,
                rev: commit.to_string(),
            });
        }
        let cmd = self.repo.git().args(["rev-list", "--objects", commit]);
        self.start(cmd, include_path)
    }

    /// Objects reachable from `end` but not from `start`.
    pub fn span(&self, start: &str, end: &str, include_path: bool) -> Result<ObjectStream> {
        let (start, end) = (start.trim(), end.trim());
        if !verify_commit(&self.repo, start) {
            return Err(ScanError::InvalidCommit {
                side: CommitSide::Start,
                rev: start.to_string(),
            });
        }
        if !verify_commit(&self.repo, end) {
            return Err(ScanError::InvalidCommit {
                side: CommitSide::End,
                rev: end.to_string(),
            });
        }
        let cmd = self
            .repo
            .git()
            .args(["rev-list", "--objects"])
            .arg(format!("{}..{}", start, end));
        self.start(cmd, include_path)
    }

    fn start(&self, cmd: GitCommand, include_path: bool) -> Result<ObjectStream> {
        let command = cmd.command_string();
        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let child = Arc::new(Mutex::new(child));

        let (tx, rx) = bounded(0);
        let reader = {
            let child = Arc::clone(&child);
            let cancel = self.cancel.clone();
            thread::Builder::new()
                .name("githook-rev-list".into())
                .spawn(move || {
                    read_listing(ListingTask {
                        command,
                        child,
                        stdout,
                        stderr,
                        include_path,
                        tx,
                        cancel,
                    })
                })
                .map_err(githook_utils::UtilError::Io)?
        };

        Ok(ObjectStream {
            rx: Some(rx),
            cancel: self.cancel.clone(),
            child: Some(child),
            reader: Some(reader),
        })
    }
}

/// List every object reachable from `commit`.
///
/// Fails before anything is started if `commit` does not resolve.
pub fn enumerate_single_commit(repo: &Repo, commit: &str, include_path: bool) -> Result<ObjectStream> {
    Enumerator::new(repo.clone()).single_commit(commit, include_path)
}

/// List the objects reachable from `end` but not from `start`.
///
/// Both sides are verified before anything is started; the error names the
/// side that failed.
pub fn enumerate_span(repo: &Repo, start: &str, end: &str, include_path: bool) -> Result<ObjectStream> {
    Enumerator::new(repo.clone()).span(start, end, include_path)
}

struct ListingTask<O, E> {
    command: String,
    child: Arc<Mutex<Child>>,
    stdout: Option<O>,
    stderr: Option<E>,
    include_path: bool,
    tx: Sender<Result<ListedObject>>,
    cancel: CancelToken,
}

fn read_listing<O: Read, E: Read + Send>(task: ListingTask<O, E>) {
    let ListingTask {
        command,
        child,
        stdout,
        stderr,
        include_path,
        tx,
        cancel,
    } = task;

    // Stderr has to be drained concurrently: a child blocked on a full
    // stderr pipe never finishes its stdout.
    let (listed, read_error, stderr_text) = thread::scope(|scope| {
        let drain = stderr.map(|stderr| scope.spawn(move || read_tail(stderr, STDERR_TAIL)));
        let (listed, read_error) = match stdout {
            Some(stdout) => forward_objects(stdout, &child, include_path, &tx, &cancel),
            None => (0, None),
        };
        let stderr_text = drain
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        (listed, read_error, stderr_text)
    });

    let status = child.lock().unwrap_or_else(PoisonError::into_inner).wait();
    if cancel.is_cancelled() {
        debug!(%command, listed, "listing cancelled");
        return;
    }

    let failure = match (status, read_error) {
        (_, Some(e)) => Some(ScanError::ToolInvocation(githook_utils::UtilError::Subprocess {
            command: command.clone(),
            source: e,
        })),
        (Err(e), None) => Some(ScanError::ToolInvocation(githook_utils::UtilError::Subprocess {
            command: command.clone(),
            source: e,
        })),
        (Ok(status), None) if !status.success() => Some(ScanError::Listing {
            command: command.clone(),
            status,
            stderr: stderr_text,
        }),
        (Ok(_), None) => None,
    };

    debug!(%command, listed, failed = failure.is_some(), "listing finished");
    if let Some(err) = failure {
        cancel.send(&tx, Err(err));
    }
}

/// Forward listed objects downstream. Returns how many were sent and the
/// read error that ended the listing, if any.
fn forward_objects<O: Read>(
    stdout: O,
    child: &Mutex<Child>,
    include_path: bool,
    tx: &Sender<Result<ListedObject>>,
    cancel: &CancelToken,
) -> (usize, Option<std::io::Error>) {
    let mut listed = 0usize;
    let mut reader = BufReader::new(stdout);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => return (listed, None),
            Ok(_) => {}
            Err(e) => {
                let _ = child.lock().unwrap_or_else(PoisonError::into_inner).kill();
                return (listed, Some(e));
            }
        }
        let Some(object) = ListedObject::parse_line(&line) else {
            continue;
        };
        let object = if include_path { object } else { object.without_path() };
        if !cancel.send(tx, Ok(object)) {
            let _ = child.lock().unwrap_or_else(PoisonError::into_inner).kill();
            return (listed, None);
        }
        listed += 1;
    }
}

/// Read `source` to EOF, keeping at most the last `limit` bytes.
fn read_tail<R: Read>(mut source: R, limit: usize) -> String {
    let mut tail = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > limit {
                    let excess = tail.len() - limit;
                    tail.drain(..excess);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&tail).trim().to_string()
}
