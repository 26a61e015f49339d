//! Push admission scanning: find every blob a commit range introduces whose
//! size matches a predicate.
//!
//! The crate is a three-stage pipeline over git plumbing:
//!
//! 1. [`resolve`] validates revisions and counts commits between them,
//!    including the branch-creation case where the old side is the null id.
//! 2. [`listing`] streams `git rev-list --objects` output as
//!    [`ListedObject`]s without ever holding the whole object set.
//! 3. [`details`] groups listed objects, asks `git cat-file --batch-check`
//!    for type and size once per group, and emits [`ObjectRecord`]s for
//!    blobs that pass the size predicate.
//!
//! [`files`] answers the smaller per-commit questions: the paths a commit
//! touched and the size of one file at a commit.
//!
//! [`Scanner`] wires the stages together and owns the span-or-single
//! decision for a [`CommitRange`]. Stages run on worker threads joined by
//! rendezvous channels, so a slow consumer throttles the producers, and
//! every stream can be cancelled (dropping it is enough).

mod cancel;
pub mod details;
mod error;
pub mod files;
pub mod listing;
mod oid;
pub mod pipeline;
pub mod range;
mod repo;
pub mod resolve;

pub use cancel::CancelToken;
pub use details::{
    parse_batch_line, resolve_details, BatchEntry, Detail, DetailResolver, DetailStream,
    GroupFailure, ObjectKind, ObjectRecord, SizePredicate, DEFAULT_GROUP_SIZE,
};
pub use error::{CommitSide, ScanError};
pub use files::{file_size, files_in_commit, formatted_file_size};
pub use listing::{enumerate_single_commit, enumerate_span, Enumerator, ListedObject, ObjectStream};
pub use oid::{is_null_revision, ObjectId};
pub use pipeline::{FailurePolicy, Scanner};
pub use range::{CommitRange, ScanPlan};
pub use repo::Repo;
pub use resolve::{count_commits, verify_commit};

pub type Result<T> = std::result::Result<T, ScanError>;
