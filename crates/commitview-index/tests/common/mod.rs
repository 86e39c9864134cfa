//! Shared fixtures: scratch git repositories built with git2 and in-memory collaborators

#![allow(dead_code)]

use anyhow::Result;
use commitview_core::{
    GitRepository, Issue, IssueSource, PermissionOracle, RepoId, Repository, RepositoryError,
    RepositoryKind, RepositorySource, User, Version, VersionSource,
};
use commitview_core::PatternKeyExtractor;
use commitview_index::{
    CommitIndexer, GitRepositoryService, IndexerConfig, QueryEngine, DEFAULT_MAX_COMMITS,
};
use git2::{BranchType, Commit, Oid, Signature, Time};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Base commit time; fixtures pass small offsets to keep ordering explicit
pub const T0: i64 = 1_600_000_000;

/// A non-bare scratch repository whose commits are written straight to branch refs
pub struct Fixture {
    pub dir: TempDir,
    pub path: PathBuf,
    pub repo: git2::Repository,
}

impl Fixture {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let path = dir.path().join("source");
        let repo = git2::Repository::init(&path)?;
        Ok(Self { dir, path, repo })
    }

    /// Repository descriptor pointing at this fixture in place
    pub fn git_repository(&self, name: &str) -> GitRepository {
        let mut repository = GitRepository::new(name, format!("file://{}", self.path.display()));
        repository.active = true;
        repository
    }

    fn signature(time: i64) -> Result<Signature<'static>> {
        Ok(Signature::new("Test Author", "author@example.com", &Time::new(time, 0))?)
    }

    fn tip(&self, branch: &str) -> Result<Option<Commit<'_>>> {
        match self.repo.find_branch(branch, BranchType::Local) {
            Ok(b) => Ok(Some(b.get().peel_to_commit()?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_commit(
        &self,
        branch: &str,
        parents: &[&Commit<'_>],
        edit: impl FnOnce(&mut git2::TreeBuilder<'_>) -> Result<()>,
        message: &str,
        time: i64,
    ) -> Result<Oid> {
        let base = match parents.first() {
            Some(parent) => Some(parent.tree()?),
            None => None,
        };
        let mut builder = self.repo.treebuilder(base.as_ref())?;
        edit(&mut builder)?;
        let tree = self.repo.find_tree(builder.write()?)?;
        let sig = Self::signature(time)?;
        let refname = format!("refs/heads/{}", branch);
        Ok(self.repo.commit(Some(&refname), &sig, &sig, message, &tree, parents)?)
    }

    /// Commits `file` with `content` on top of `branch`, creating the branch if needed
    pub fn commit(
        &self,
        branch: &str,
        file: &str,
        content: &str,
        message: &str,
        time: i64,
    ) -> Result<Oid> {
        let parent = self.tip(branch)?;
        let blob = self.repo.blob(content.as_bytes())?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        self.write_commit(
            branch,
            &parents,
            |builder| {
                builder.insert(file, blob, 0o100644)?;
                Ok(())
            },
            message,
            time,
        )
    }

    /// Writes several files at once on top of `branch`; `None` removes the file
    pub fn commit_changes(
        &self,
        branch: &str,
        edits: &[(&str, Option<&str>)],
        message: &str,
        time: i64,
    ) -> Result<Oid> {
        let parent = self.tip(branch)?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        let mut blobs = Vec::with_capacity(edits.len());
        for (file, content) in edits {
            let blob = match content {
                Some(content) => Some(self.repo.blob(content.as_bytes())?),
                None => None,
            };
            blobs.push((*file, blob));
        }
        self.write_commit(
            branch,
            &parents,
            |builder| {
                for (file, blob) in blobs {
                    match blob {
                        Some(blob) => {
                            builder.insert(file, blob, 0o100644)?;
                        }
                        None => builder.remove(file)?,
                    }
                }
                Ok(())
            },
            message,
            time,
        )
    }

    /// Renames a file on `branch` keeping its content
    pub fn rename(
        &self,
        branch: &str,
        from: &str,
        to: &str,
        message: &str,
        time: i64,
    ) -> Result<Oid> {
        let parent = self.tip(branch)?.ok_or_else(|| anyhow::anyhow!("no branch {}", branch))?;
        let entry = parent
            .tree()?
            .get_name(from)
            .map(|e| (e.id(), e.filemode()))
            .ok_or_else(|| anyhow::anyhow!("no file {}", from))?;
        self.write_commit(
            branch,
            &[&parent],
            |builder| {
                builder.remove(from)?;
                builder.insert(to, entry.0, entry.1)?;
                Ok(())
            },
            message,
            time,
        )
    }

    /// Merge commit on `branch` with `other` as second parent; the tree unions both sides
    pub fn merge(&self, branch: &str, other: &str, message: &str, time: i64) -> Result<Oid> {
        let ours = self.tip(branch)?.ok_or_else(|| anyhow::anyhow!("no branch {}", branch))?;
        let theirs = self.tip(other)?.ok_or_else(|| anyhow::anyhow!("no branch {}", other))?;
        let their_tree = theirs.tree()?;
        self.write_commit(
            branch,
            &[&ours, &theirs],
            |builder| {
                for entry in their_tree.iter() {
                    if let Some(name) = entry.name() {
                        if builder.get(name)?.is_none() {
                            builder.insert(name, entry.id(), entry.filemode())?;
                        }
                    }
                }
                Ok(())
            },
            message,
            time,
        )
    }

    pub fn create_branch(&self, name: &str, from: &str) -> Result<()> {
        let commit = self.tip(from)?.ok_or_else(|| anyhow::anyhow!("no branch {}", from))?;
        self.repo.branch(name, &commit, false)?;
        Ok(())
    }

    /// Points `branch` at the tip of `to`
    pub fn fast_forward(&self, branch: &str, to: &str) -> Result<()> {
        let target = self.tip(to)?.ok_or_else(|| anyhow::anyhow!("no branch {}", to))?;
        self.repo
            .reference(&format!("refs/heads/{}", branch), target.id(), true, "fast-forward")?;
        Ok(())
    }

    /// Moves `branch` to an arbitrary commit, as `git reset --hard` would
    pub fn reset(&self, branch: &str, to: Oid) -> Result<()> {
        self.repo
            .reference(&format!("refs/heads/{}", branch), to, true, "reset")?;
        Ok(())
    }

    pub fn delete_branch(&self, name: &str) -> Result<()> {
        self.repo.find_branch(name, BranchType::Local)?.delete()?;
        Ok(())
    }
}

/// Registry backed by a map
#[derive(Default)]
pub struct StaticRepositories {
    repositories: Mutex<HashMap<RepoId, Repository>>,
}

impl StaticRepositories {
    pub fn with(repositories: &[&GitRepository]) -> Arc<Self> {
        let registry = Self::default();
        for repository in repositories {
            registry.insert(repository);
        }
        Arc::new(registry)
    }

    pub fn insert(&self, repository: &GitRepository) {
        self.repositories
            .lock()
            .unwrap()
            .insert(repository.id, Repository::Git(repository.clone()));
    }
}

impl RepositorySource for StaticRepositories {
    fn get_by_id(&self, id: RepoId) -> Result<Option<Repository>, RepositoryError> {
        Ok(self.repositories.lock().unwrap().get(&id).cloned())
    }

    fn iterate(&self, kind: RepositoryKind) -> Result<Vec<Repository>, RepositoryError> {
        let mut all: Vec<Repository> = self
            .repositories
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.kind() == kind)
            .cloned()
            .collect();
        all.sort_by(|a, b| a.display_name().cmp(b.display_name()));
        Ok(all)
    }
}

/// Issue tracker stand-in: every key exists, some are hidden, some were moved
#[derive(Default)]
pub struct FakeTracker {
    pub hidden: HashSet<String>,
    pub prior: HashMap<String, Vec<String>>,
    pub fix_versions: HashMap<String, Vec<String>>,
    pub affects_versions: HashMap<String, Vec<String>>,
}

impl IssueSource for FakeTracker {
    fn get_by_key(&self, key: &str) -> Option<Issue> {
        Some(Issue::new(key))
    }

    fn prior_keys_for(&self, issue: &Issue) -> Vec<String> {
        self.prior.get(&issue.key).cloned().unwrap_or_default()
    }
}

impl VersionSource for FakeTracker {
    fn issues_with_fix_version(&self, version: &Version) -> Vec<Issue> {
        self.fix_versions
            .get(&version.name)
            .map(|keys| keys.iter().map(Issue::new).collect())
            .unwrap_or_default()
    }

    fn issues_with_affects_version(&self, version: &Version) -> Vec<Issue> {
        self.affects_versions
            .get(&version.name)
            .map(|keys| keys.iter().map(Issue::new).collect())
            .unwrap_or_default()
    }
}

impl PermissionOracle for FakeTracker {
    fn can_view_commits(&self, issue: &Issue, _user: &User) -> bool {
        !self.hidden.contains(&issue.key)
    }
}

/// Indexer over a fresh index root using the real git service
pub fn git_indexer(root: &TempDir) -> Result<Arc<CommitIndexer>> {
    let config = IndexerConfig::new(root.path());
    let service = Arc::new(GitRepositoryService::new(config.clone()));
    let keys = Arc::new(PatternKeyExtractor::new()?);
    Ok(Arc::new(CommitIndexer::new(config, service, keys)?))
}

/// Query engine reading the indexer's store, with the tracker answering every collaborator role
pub fn query_engine(
    indexer: &CommitIndexer,
    repositories: Arc<StaticRepositories>,
    tracker: Arc<FakeTracker>,
) -> Result<QueryEngine> {
    Ok(QueryEngine::new(
        indexer.store().clone(),
        indexer.service().clone(),
        repositories,
        tracker.clone(),
        tracker.clone(),
        tracker,
        DEFAULT_MAX_COMMITS,
    )?)
}
