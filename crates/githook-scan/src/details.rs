//! Batched object metadata: turn listed objects into size-filtered blob
//! records with one `git cat-file --batch-check` per group.

use std::fmt;
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};

use bstr::{BString, ByteSlice};
use crossbeam::channel::{bounded, Receiver, Sender};
use regex::bytes::Regex;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::listing::ListedObject;
use crate::oid::ObjectId;
use crate::repo::Repo;
use crate::{Result, ScanError};

/// Objects per bulk query unless configured otherwise.
pub const DEFAULT_GROUP_SIZE: usize = 1000;

const BATCH_CHECK_FORMAT: &str =
    "--batch-check=%(objectname) %(objectsize) %(objecttype) %(rest)";

/// Caller-supplied size test, evaluated once per candidate blob.
pub type SizePredicate = Box<dyn Fn(u64) -> bool + Send + 'static>;

/// A blob found in the scanned range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub size: u64,
    pub path: BString,
}

/// The object types a batch-check line is accepted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Blob,
    Tree,
}

/// One parsed batch-check response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub id: String,
    pub size: u64,
    pub kind: ObjectKind,
    pub path: Option<BString>,
}

/// A bulk query that ran but did not succeed. Its group's records are
/// withheld as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFailure {
    /// Zero-based index of the group within the run.
    pub group: usize,
    /// Number of listed objects in the group.
    pub objects: usize,
    pub reason: String,
}

impl fmt::Display for GroupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch query for group {} ({} objects) failed: {}",
            self.group, self.objects, self.reason
        )
    }
}

/// One item of a detail stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detail {
    Record(ObjectRecord),
    GroupFailed(GroupFailure),
}

fn batch_line_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?-u)^([0-9a-f]+) ([0-9]+) (blob|tree)(?: (.+))?$").ok())
        .as_ref()
}

/// Parse one `cat-file --batch-check` response line.
///
/// Accepts `<hex> <size> <blob|tree>[ <path>]` and nothing else; `missing`
/// markers, commits and garbage all yield `None`.
pub fn parse_batch_line(line: &[u8]) -> Option<BatchEntry> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let caps = batch_line_regex()?.captures(line)?;
    let id = caps.get(1)?.as_bytes().to_str().ok()?.to_string();
    let size = caps.get(2)?.as_bytes().to_str().ok()?.parse::<u64>().ok()?;
    let kind = match caps.get(3)?.as_bytes() {
        b"blob" => ObjectKind::Blob,
        _ => ObjectKind::Tree,
    };
    let path = caps.get(4).map(|m| BString::from(m.as_bytes()));
    Some(BatchEntry {
        id,
        size,
        kind,
        path,
    })
}

/// Whether a parsed entry becomes a record: blobs with a path whose size
/// passes the filter.
fn accept(entry: BatchEntry, filter: Option<&SizePredicate>) -> Option<ObjectRecord> {
    if entry.kind != ObjectKind::Blob {
        return None;
    }
    let path = entry.path.filter(|p| !p.is_empty())?;
    if let Some(filter) = filter {
        if !filter(entry.size) {
            return None;
        }
    }
    let id = ObjectId::from_hex(&entry.id).ok()?;
    Some(ObjectRecord {
        id,
        size: entry.size,
        path,
    })
}

/// Groups listed objects and resolves their details in bulk.
#[derive(Debug, Clone)]
pub struct DetailResolver {
    repo: Repo,
    group_size: usize,
    cancel: CancelToken,
}

impl DetailResolver {
    pub fn new(repo: Repo) -> Self {
        Self {
            repo,
            group_size: DEFAULT_GROUP_SIZE,
            cancel: CancelToken::new(),
        }
    }

    /// Objects per bulk query. Clamped to at least one.
    pub fn group_size(mut self, size: usize) -> Self {
        self.group_size = size.max(1);
        self
    }

    /// Share a cancellation token with the rest of a pipeline.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Consume `objects` on a worker thread and stream back the blob records
    /// that pass `filter`, in group order.
    ///
    /// A group whose query fails yields a single [`Detail::GroupFailed`] in
    /// place of its records. An error from the input, or a bulk query that
    /// cannot be started at all, ends the stream with that error.
    pub fn resolve<I>(&self, objects: I, filter: Option<SizePredicate>) -> Result<DetailStream>
    where
        I: IntoIterator<Item = Result<ListedObject>>,
        I::IntoIter: Send + 'static,
    {
        let objects = objects.into_iter();
        let (tx, rx) = bounded(0);
        let worker = GroupWorker {
            repo: self.repo.clone(),
            group_size: self.group_size,
            filter,
            tx,
            cancel: self.cancel.clone(),
            groups: 0,
        };
        let handle = thread::Builder::new()
            .name("githook-batch-check".into())
            .spawn(move || worker.run(objects))
            .map_err(githook_utils::UtilError::Io)?;

        Ok(DetailStream {
            rx: Some(rx),
            cancel: self.cancel.clone(),
            worker: Some(handle),
        })
    }
}

/// Consume `objects` in groups of [`DEFAULT_GROUP_SIZE`] and stream the
/// matching blob records.
pub fn resolve_details<I>(repo: &Repo, objects: I, filter: Option<SizePredicate>) -> Result<DetailStream>
where
    I: IntoIterator<Item = Result<ListedObject>>,
    I::IntoIter: Send + 'static,
{
    DetailResolver::new(repo.clone()).resolve(objects, filter)
}

/// Records produced by a [`DetailResolver`].
///
/// Dropping the stream cancels the run and joins the worker.
pub struct DetailStream {
    rx: Option<Receiver<Result<Detail>>>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

impl DetailStream {
    /// The token that cancels this stream and everything feeding it.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

impl Iterator for DetailStream {
    type Item = Result<Detail>;

    fn next(&mut self) -> Option<Self::Item> {
        let rx = self.rx.as_ref()?;
        let item = self.cancel.recv(rx);
        if item.is_none() {
            self.rx = None;
        }
        item
    }
}

impl Drop for DetailStream {
    fn drop(&mut self) {
        if self.rx.is_some() {
            self.cancel.cancel();
        }
        self.rx = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl fmt::Debug for DetailStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetailStream")
            .field("live", &self.rx.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Outcome of one bulk query.
enum GroupOutcome {
    Entries(Vec<BatchEntry>),
    Failed(String),
}

struct GroupWorker {
    repo: Repo,
    group_size: usize,
    filter: Option<SizePredicate>,
    tx: Sender<Result<Detail>>,
    cancel: CancelToken,
    groups: usize,
}

impl GroupWorker {
    fn run(mut self, objects: impl Iterator<Item = Result<ListedObject>>) {
        let mut group = Vec::with_capacity(self.group_size);
        for item in objects {
            if self.cancel.is_cancelled() {
                return;
            }
            match item {
                Ok(object) => {
                    group.push(object);
                    if group.len() >= self.group_size && !self.flush(&mut group) {
                        return;
                    }
                }
                Err(e) => {
                    // What was listed before the failure is still valid.
                    if self.flush(&mut group) {
                        self.cancel.send(&self.tx, Err(e));
                    }
                    return;
                }
            }
        }
        self.flush(&mut group);
    }

    /// Query and emit one group. Returns false when the run must stop.
    fn flush(&mut self, group: &mut Vec<ListedObject>) -> bool {
        if group.is_empty() {
            return true;
        }
        let index = self.groups;
        self.groups += 1;
        let objects = group.len();
        debug!(group = index, objects, "querying object details");

        let outcome = match query_group(&self.repo, group) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.cancel.send(&self.tx, Err(e));
                return false;
            }
        };
        group.clear();

        match outcome {
            GroupOutcome::Entries(entries) => {
                for entry in entries {
                    if let Some(record) = accept(entry, self.filter.as_ref()) {
                        if !self.cancel.send(&self.tx, Ok(Detail::Record(record))) {
                            return false;
                        }
                    }
                }
                true
            }
            GroupOutcome::Failed(reason) => {
                debug!(group = index, objects, %reason, "object detail query failed");
                let failure = GroupFailure {
                    group: index,
                    objects,
                    reason,
                };
                self.cancel.send(&self.tx, Ok(Detail::GroupFailed(failure)))
            }
        }
    }
}

/// Run one `cat-file --batch-check` over `group`.
///
/// Only a program that cannot be started is an error; anything that goes
/// wrong once it runs is a [`GroupOutcome::Failed`].
fn query_group(repo: &Repo, group: &[ListedObject]) -> Result<GroupOutcome> {
    let mut input = Vec::with_capacity(group.len() * 64);
    for object in group {
        object.write_batch_line(&mut input);
    }

    let cmd = repo.git().args(["cat-file", BATCH_CHECK_FORMAT]);
    let result = match cmd.run_with_input(&input) {
        Ok(result) => result,
        Err(e) if e.is_spawn_failure() => return Err(ScanError::ToolInvocation(e)),
        Err(e) => return Ok(GroupOutcome::Failed(e.to_string())),
    };
    if !result.success() {
        return Ok(GroupOutcome::Failed(format!(
            "{} exited with {}: {}",
            cmd.command_string(),
            result.status,
            result.stderr_trimmed()
        )));
    }

    Ok(GroupOutcome::Entries(match_entries(&result.stdout, group)))
}

/// Parse a batch-check response for `group`.
///
/// `%(rest)` loses the whitespace that separates it from the id, so a path
/// starting with a space comes back shortened. Each input line gets exactly
/// one response line, which lets the listed path be taken back by position
/// whenever the ids line up.
fn match_entries(stdout: &[u8], group: &[ListedObject]) -> Vec<BatchEntry> {
    let lines: Vec<&[u8]> = stdout.lines().collect();
    let aligned = lines.len() == group.len();
    lines
        .iter()
        .enumerate()
        .filter_map(|(index, line)| {
            let mut entry = parse_batch_line(line)?;
            if aligned {
                let listed = &group[index];
                if listed.id == entry.id {
                    entry.path = listed.path.clone();
                }
            }
            Some(entry)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OID: &str = "a94a8fe5ccb19ba61c4c0873d391e987982fbbd3";

    #[test]
    fn parse_blob_with_path() {
        let entry = parse_batch_line(format!("{OID} 3072 blob assets/big.bin").as_bytes()).unwrap();
        assert_eq!(entry.id, OID);
        assert_eq!(entry.size, 3072);
        assert_eq!(entry.kind, ObjectKind::Blob);
        assert_eq!(entry.path, Some(BString::from("assets/big.bin")));
    }

    #[test]
    fn parse_tree_without_path() {
        let entry = parse_batch_line(format!("{OID} 120 tree").as_bytes()).unwrap();
        assert_eq!(entry.kind, ObjectKind::Tree);
        assert_eq!(entry.path, None);
    }

    #[test]
    fn parse_keeps_spaces_in_path() {
        let entry = parse_batch_line(format!("{OID} 5 blob a b  c.txt").as_bytes()).unwrap();
        assert_eq!(entry.path, Some(BString::from("a b  c.txt")));
    }

    #[test]
    fn parse_rejects_other_lines() {
        assert!(parse_batch_line(b"invalid1 missing").is_none());
        assert!(parse_batch_line(format!("{OID} 250 commit").as_bytes()).is_none());
        assert!(parse_batch_line(format!("{OID} -1 blob x").as_bytes()).is_none());
        assert!(parse_batch_line(format!("{} 1 blob x", OID.to_uppercase()).as_bytes()).is_none());
        assert!(parse_batch_line(b"").is_none());
    }

    #[test]
    fn parse_rejects_oversized_numbers() {
        let line = format!("{OID} 99999999999999999999999 blob x");
        assert!(parse_batch_line(line.as_bytes()).is_none());
    }

    #[test]
    fn parse_non_utf8_path() {
        let mut line = format!("{OID} 9 blob caf").into_bytes();
        line.push(0xe9);
        let entry = parse_batch_line(&line).unwrap();
        assert_eq!(entry.path.unwrap().last(), Some(&0xe9));
    }

    fn entry(kind: ObjectKind, size: u64, path: Option<&str>) -> BatchEntry {
        BatchEntry {
            id: OID.to_string(),
            size,
            kind,
            path: path.map(BString::from),
        }
    }

    #[test]
    fn accept_requires_blob_and_path() {
        assert!(accept(entry(ObjectKind::Tree, 10, Some("dir")), None).is_none());
        assert!(accept(entry(ObjectKind::Blob, 10, None), None).is_none());
        assert!(accept(entry(ObjectKind::Blob, 10, Some("")), None).is_none());
        let record = accept(entry(ObjectKind::Blob, 10, Some("f.txt")), None).unwrap();
        assert_eq!(record.size, 10);
        assert_eq!(record.id.as_str(), OID);
    }

    #[test]
    fn accept_applies_filter() {
        let big: SizePredicate = Box::new(|size| size > 2048);
        assert!(accept(entry(ObjectKind::Blob, 2048, Some("a")), Some(&big)).is_none());
        assert!(accept(entry(ObjectKind::Blob, 2049, Some("a")), Some(&big)).is_some());
    }

    #[test]
    fn listed_paths_survive_leading_whitespace() {
        let group = vec![
            ListedObject::new(OID, Some(BString::from("  lead.txt"))),
            ListedObject::new(OID, None),
        ];
        let stdout = format!("{OID} 5 blob lead.txt\n{OID} 5 blob\n");
        let entries = match_entries(stdout.as_bytes(), &group);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, Some(BString::from("  lead.txt")));
        assert_eq!(entries[1].path, None);
    }

    #[test]
    fn misaligned_response_keeps_reported_paths() {
        let other = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
        let group = vec![ListedObject::new(other, Some(BString::from(" x.txt")))];
        let stdout = format!("{OID} 5 blob x.txt\n");
        let entries = match_entries(stdout.as_bytes(), &group);
        assert_eq!(entries[0].path, Some(BString::from("x.txt")));

        let stdout = format!("{OID} 5 blob a.txt\n{OID} 6 blob b.txt\n");
        let entries = match_entries(stdout.as_bytes(), &group);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].path, Some(BString::from("b.txt")));
    }

    #[test]
    fn group_failure_display() {
        let failure = GroupFailure {
            group: 2,
            objects: 1000,
            reason: "broken pipe".into(),
        };
        assert_eq!(
            failure.to_string(),
            "batch query for group 2 (1000 objects) failed: broken pipe"
        );
    }
}
