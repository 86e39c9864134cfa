//! Branch-attributing history walk
//!
//! The walk order is planned up front by a topological, commit-time revwalk
//! over the seeds, so no commit is emitted before every child reachable from
//! the seeds. Each frontier entry carries the branch names whose tips reach
//! it; emitting a commit hands its names on to its parents, so a commit
//! reachable from several seeds is emitted once with the union of their names.

use commitview_core::{CommitKey, CommitRecord, RepoId, RepositoryError, Seed};
use git2::{Commit, Oid, Repository, Sort};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};

use super::changes::classify_changes;
use super::errors::git_error;
use super::local_branches;

/// Lazy, non-restartable walk over the history reachable from a set of seeds
pub struct CommitWalker {
    repo_id: RepoId,
    path: PathBuf,
    repo: Repository,

    /// Commits reached so far and the branch names reaching them
    frontier: HashMap<Oid, BTreeSet<String>>,

    /// Commits still to emit, children before parents, newest first
    order: VecDeque<Oid>,

    refresh_interval: usize,
    since_refresh: usize,
    detect_renames: bool,
    failed: bool,
}

impl CommitWalker {
    /// Opens the repository at `path` and plans the walk from the seeds
    ///
    /// With no seeds, every local branch tip seeds its own name. Seeds whose
    /// commit no longer exists are dropped.
    pub fn new(
        repo_id: RepoId,
        path: &Path,
        seeds: &[Seed],
        refresh_interval: usize,
        detect_renames: bool,
    ) -> Result<Self, RepositoryError> {
        let repo = open_repository(path)?;
        let mut walker = Self {
            repo_id,
            path: path.to_path_buf(),
            repo,
            frontier: HashMap::new(),
            order: VecDeque::new(),
            refresh_interval,
            since_refresh: 0,
            detect_renames,
            failed: false,
        };

        if seeds.is_empty() {
            for (name, oid, _) in local_branches(&walker.repo)? {
                walker.seed(oid, BTreeSet::from([name]))?;
            }
        } else {
            for seed in seeds {
                let oid = Oid::from_str(seed.key.hash()).map_err(|e| {
                    RepositoryError::InvalidRef(format!("{}: {}", seed.key.hash(), e))
                })?;
                walker.seed(oid, seed.branches.clone())?;
            }
        }
        walker.plan()?;

        log::debug!(
            "Walker for {} seeded with {} commits, {} to visit",
            walker.repo_id,
            walker.frontier.len(),
            walker.order.len()
        );
        Ok(walker)
    }

    fn seed(&mut self, oid: Oid, names: BTreeSet<String>) -> Result<(), RepositoryError> {
        if names.is_empty() {
            return Ok(());
        }
        match self.repo.find_commit(oid) {
            Ok(_) => {}
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                log::warn!("Ignoring missing seed {} for {:?}", oid, names);
                return Ok(());
            }
            Err(e) => return Err(git_error(format!("Failed to load seed {}", oid), e)),
        }
        self.frontier.entry(oid).or_default().extend(names);
        Ok(())
    }

    /// Orders every commit reachable from the seeds, children first
    fn plan(&mut self) -> Result<(), RepositoryError> {
        if self.frontier.is_empty() {
            return Ok(());
        }
        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(|e| git_error("Failed to start history walk", e))?;
        revwalk
            .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
            .map_err(|e| git_error("Failed to sort history walk", e))?;
        for oid in self.frontier.keys() {
            revwalk
                .push(*oid)
                .map_err(|e| git_error(format!("Failed to seed walk at {}", oid), e))?;
        }
        for item in revwalk {
            let oid = item.map_err(|e| git_error("Failed to walk history", e))?;
            self.order.push_back(oid);
        }
        Ok(())
    }

    /// Drops the repository handle and its object cache
    fn refresh(&mut self) -> Result<(), RepositoryError> {
        log::debug!(
            "Renewing walker for {} after {} commits ({} pending)",
            self.repo_id,
            self.since_refresh,
            self.frontier.len()
        );
        self.repo = open_repository(&self.path)?;
        self.since_refresh = 0;
        Ok(())
    }

    fn advance(&mut self) -> Result<Option<CommitRecord>, RepositoryError> {
        if self.refresh_interval > 0 && self.since_refresh >= self.refresh_interval {
            self.refresh()?;
        }

        let Some(oid) = self.order.pop_front() else {
            return Ok(None);
        };
        let names = self.frontier.remove(&oid).unwrap_or_default();
        debug_assert!(
            !names.is_empty(),
            "commit {} reached with no branch attribution",
            oid
        );
        self.since_refresh += 1;

        let commit = self
            .repo
            .find_commit(oid)
            .map_err(|e| git_error(format!("Failed to load commit {}", oid), e))?;

        for parent_id in commit.parent_ids() {
            self.frontier
                .entry(parent_id)
                .or_default()
                .extend(names.iter().cloned());
        }

        let record = commit_record(
            &self.repo,
            self.repo_id,
            &commit,
            names,
            self.detect_renames,
        )?;
        Ok(Some(record))
    }
}

impl Iterator for CommitWalker {
    type Item = Result<CommitRecord, RepositoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.advance() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

pub(crate) fn open_repository(path: &Path) -> Result<Repository, RepositoryError> {
    Repository::open(path)
        .map_err(|e| git_error(format!("Failed to open repository at {:?}", path), e))
}

pub(crate) fn commit_key(commit: &Commit<'_>) -> CommitKey {
    CommitKey::new(commit.id().to_string(), commit.time().seconds() as i32)
}

/// Builds the record of one commit, classifying its changes
pub(crate) fn commit_record(
    repo: &Repository,
    repo_id: RepoId,
    commit: &Commit<'_>,
    branches: BTreeSet<String>,
    detect_renames: bool,
) -> Result<CommitRecord, RepositoryError> {
    let parent = match commit.parent_ids().next() {
        Some(parent_id) => {
            let parent = repo.find_commit(parent_id).map_err(|e| {
                git_error(format!("Parent {} of {} is unreachable", parent_id, commit.id()), e)
            })?;
            Some(commit_key(&parent))
        }
        None => None,
    };

    let changes = classify_changes(repo, commit, detect_renames)
        .map_err(|e| git_error(format!("Failed to diff commit {}", commit.id()), e))?;

    Ok(CommitRecord {
        repo_id,
        key: commit_key(commit),
        parent,
        branches,
        author: String::from_utf8_lossy(commit.author().name_bytes()).into_owned(),
        timestamp: commit.time().seconds(),
        message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        is_merge: commit.parent_count() > 1,
        changes,
    })
}
