//! Wiring: plan a range, enumerate it, resolve details, collect.

use tracing::{debug, info, warn};

use crate::details::{Detail, DetailResolver, DetailStream, ObjectRecord, SizePredicate, DEFAULT_GROUP_SIZE};
use crate::listing::{Enumerator, ListedObject};
use crate::range::{CommitRange, ScanPlan};
use crate::repo::Repo;
use crate::resolve::{count_commits, verify_commit};
use crate::{CancelToken, CommitSide, Result, ScanError};

/// What [`Scanner::oversized`] does when a bulk query fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort with [`ScanError::GroupFailed`]. An admission decision must not
    /// be made on partial results.
    #[default]
    Escalate,
    /// Log the failure and keep the records of the other groups.
    Tolerate,
}

/// Runs scans against one repository.
#[derive(Debug, Clone)]
pub struct Scanner {
    repo: Repo,
    group_size: usize,
    policy: FailurePolicy,
}

impl Scanner {
    pub fn new(repo: Repo) -> Self {
        Self {
            repo,
            group_size: DEFAULT_GROUP_SIZE,
            policy: FailurePolicy::default(),
        }
    }

    /// Objects per bulk query. Clamped to at least one.
    pub fn group_size(mut self, size: usize) -> Self {
        self.group_size = size.max(1);
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    /// Decide how `range` is enumerated.
    ///
    /// A created ref is scanned from the commit just below the ones it
    /// introduces. When there is no such commit (the new history has no
    /// parent beyond the counted commits) the whole of `new` is scanned.
    pub fn plan(&self, range: &CommitRange) -> Result<ScanPlan> {
        let plan = match range {
            CommitRange::Update { old, new } => ScanPlan::Span {
                start: old.clone(),
                end: new.clone(),
            },
            CommitRange::Create { new } => {
                let new = new.trim();
                if !verify_commit(&self.repo, new) {
                    return Err(ScanError::InvalidCommit {
                        side: CommitSide::Commit,
                        rev: new.to_string(),
                    });
                }
                let null = crate::ObjectId::null_sha1();
                let count = count_commits(&self.repo, new, null.as_str())?;
                let start = format!("{}~{}", new, count);
                if verify_commit(&self.repo, &start) {
                    ScanPlan::Span {
                        start,
                        end: new.to_string(),
                    }
                } else {
                    ScanPlan::Single {
                        commit: new.to_string(),
                    }
                }
            }
            CommitRange::Delete { .. } => ScanPlan::Nothing,
        };
        debug!(%range, ?plan, "planned scan");
        Ok(plan)
    }

    /// Start streaming the blobs `plan` covers that pass `filter`.
    pub fn scan(
        &self,
        plan: &ScanPlan,
        include_path: bool,
        filter: Option<SizePredicate>,
    ) -> Result<DetailStream> {
        let cancel = CancelToken::new();
        let enumerator = Enumerator::new(self.repo.clone()).with_cancel(cancel.clone());
        let resolver = DetailResolver::new(self.repo.clone())
            .group_size(self.group_size)
            .with_cancel(cancel);

        match plan {
            ScanPlan::Span { start, end } => {
                resolver.resolve(enumerator.span(start, end, include_path)?, filter)
            }
            ScanPlan::Single { commit } => {
                resolver.resolve(enumerator.single_commit(commit, include_path)?, filter)
            }
            ScanPlan::Nothing => {
                resolver.resolve(std::iter::empty::<Result<ListedObject>>(), filter)
            }
        }
    }

    /// Every blob `range` introduces that passes `filter`.
    pub fn oversized(&self, range: &CommitRange, filter: SizePredicate) -> Result<Vec<ObjectRecord>> {
        let plan = self.plan(range)?;
        if plan == ScanPlan::Nothing {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for detail in self.scan(&plan, true, Some(filter))? {
            match detail? {
                Detail::Record(record) => records.push(record),
                Detail::GroupFailed(failure) => match self.policy {
                    FailurePolicy::Escalate => return Err(ScanError::GroupFailed(failure)),
                    FailurePolicy::Tolerate => {
                        warn!(%failure, "skipping group after failed query");
                    }
                },
            }
        }
        info!(%range, matched = records.len(), "scan finished");
        Ok(records)
    }
}
