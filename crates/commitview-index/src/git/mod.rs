//! Git repository service
//!
//! `file://` repositories are read in place. Remote repositories are
//! mirrored into a bare clone under the index root whose branches track the
//! remote's branches one to one.

mod changes;
mod errors;
mod transport;
mod walker;

pub use walker::CommitWalker;

use commitview_core::{
    BranchTips, CommitKey, CommitRecord, GitRepository, RepoId, RepositoryError, RepositoryUri,
    Seed,
};
use git2::{BranchType, Direction, Oid, Repository};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use crate::config::IndexerConfig;
use crate::service::RepositoryService;
use errors::git_error;
use walker::{commit_record, open_repository};

/// Refspec mirroring remote branches onto local branches of the bare clone
const MIRROR_REFSPEC: &str = "+refs/heads/*:refs/heads/*";

const ORIGIN: &str = "origin";

/// Git implementation of [`RepositoryService`] plus repository lifecycle operations
pub struct GitRepositoryService {
    config: IndexerConfig,
}

impl GitRepositoryService {
    pub fn new(config: IndexerConfig) -> Self {
        Self { config }
    }

    /// Path of the git directory history is read from
    pub fn local_path(&self, repository: &GitRepository) -> Result<PathBuf, RepositoryError> {
        match repository.location()? {
            RepositoryUri::File(path) => Ok(path),
            RepositoryUri::Remote(_) => Ok(self.config.clone_path(repository.id)),
        }
    }

    pub fn open(&self, repository: &GitRepository) -> Result<Repository, RepositoryError> {
        open_repository(&self.local_path(repository)?)
    }

    /// Initializes the bare mirror of a remote repository when missing
    ///
    /// A clone whose `origin` no longer matches the configured URI is
    /// discarded and recreated. Returns true when a new clone was made.
    pub fn clone_if_needed(&self, repository: &GitRepository) -> Result<bool, RepositoryError> {
        let uri = match repository.location()? {
            RepositoryUri::File(path) => {
                if !path.exists() {
                    return Err(RepositoryError::WrongState(format!(
                        "local repository {:?} does not exist",
                        path
                    )));
                }
                return Ok(false);
            }
            RepositoryUri::Remote(uri) => uri,
        };

        let path = self.config.clone_path(repository.id);
        if let Ok(existing) = Repository::open_bare(&path) {
            let current_url = existing
                .find_remote(ORIGIN)
                .ok()
                .and_then(|remote| remote.url().map(str::to_string));
            if current_url.as_deref() == Some(uri.as_str()) {
                return Ok(false);
            }
            log::info!(
                "Origin of {} changed from {:?} to {}, recreating clone",
                repository.id,
                current_url,
                uri
            );
            drop(existing);
            fs::remove_dir_all(&path).map_err(|e| {
                RepositoryError::io(format!("Failed to remove stale clone at {:?}", path), e)
            })?;
        }

        fs::create_dir_all(&path)
            .map_err(|e| RepositoryError::io(format!("Failed to create {:?}", path), e))?;
        let repo = Repository::init_bare(&path)
            .map_err(|e| git_error(format!("Failed to initialize clone at {:?}", path), e))?;
        repo.remote_with_fetch(ORIGIN, &uri, MIRROR_REFSPEC)
            .map_err(|e| git_error(format!("Failed to configure origin {}", uri), e))?;
        drop(repo);

        log::info!("Cloning {} into {:?}", uri, path);
        if let Err(e) = self.fetch(repository) {
            // Leave no half-initialized clone behind so the next run starts over
            let _ = fs::remove_dir_all(&path);
            return Err(e);
        }
        Ok(true)
    }

    /// Fetches every branch from `origin`, pruning branches deleted upstream
    pub fn fetch(&self, repository: &GitRepository) -> Result<(), RepositoryError> {
        if repository.location()?.is_file() {
            return Ok(());
        }
        let repo = self.open(repository)?;
        let mut remote = repo
            .find_remote(ORIGIN)
            .map_err(|e| git_error("Clone has no origin remote", e))?;
        let mut options = transport::fetch_options(repository);
        remote
            .fetch(&[] as &[&str], Some(&mut options), None)
            .map_err(|e| git_error(format!("Failed to fetch {}", repository.uri), e))?;

        let stats = remote.stats();
        log::debug!(
            "Fetched {} objects ({} bytes) for {}",
            stats.received_objects(),
            stats.received_bytes(),
            repository.id
        );
        Ok(())
    }

    /// Checks that the repository is reachable and marks it active
    ///
    /// On failure the repository is left inactive.
    pub fn activate(&self, repository: &mut GitRepository) -> Result<(), RepositoryError> {
        repository.active = false;
        match repository.location()? {
            RepositoryUri::File(path) => {
                open_repository(&path)?;
            }
            RepositoryUri::Remote(uri) => {
                let mut remote = git2::Remote::create_detached(uri.as_str())
                    .map_err(|e| git_error(format!("Invalid remote {}", uri), e))?;
                let connection = remote
                    .connect_auth(
                        Direction::Fetch,
                        Some(transport::remote_callbacks(repository)),
                        None,
                    )
                    .map_err(|e| git_error(format!("Failed to connect to {}", uri), e))?;
                drop(connection);
            }
        }
        repository.active = true;
        log::info!("Activated repository {} ({})", repository.display_name, repository.id);
        Ok(())
    }

    /// Initializes an empty non-bare repository at a `file://` URI
    pub fn create(&self, repository: &GitRepository) -> Result<(), RepositoryError> {
        match repository.location()? {
            RepositoryUri::File(path) => {
                Repository::init(&path)
                    .map_err(|e| {
                        git_error(format!("Failed to create repository at {:?}", path), e)
                    })?;
                log::info!("Created repository at {:?}", path);
                Ok(())
            }
            RepositoryUri::Remote(uri) => Err(RepositoryError::MalformedUri(format!(
                "only file:// repositories can be created, got {}",
                uri
            ))),
        }
    }

    /// Deletes the working area of a repository; local `file://` repositories are left alone
    pub fn remove(&self, id: RepoId) -> Result<(), RepositoryError> {
        let dir = self.config.repository_dir(id);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .map_err(|e| RepositoryError::io(format!("Failed to remove {:?}", dir), e))?;
            log::info!("Removed working area {:?}", dir);
        }
        Ok(())
    }
}

impl RepositoryService for GitRepositoryService {
    type Walk = CommitWalker;

    fn synchronize(&self, repository: &GitRepository) -> Result<(), RepositoryError> {
        if !self.clone_if_needed(repository)? {
            self.fetch(repository)?;
        }
        Ok(())
    }

    fn branch_tips(&self, repository: &GitRepository) -> Result<BranchTips, RepositoryError> {
        let repo = self.open(repository)?;
        Ok(local_branches(&repo)?
            .into_iter()
            .map(|(name, oid, time)| (name, CommitKey::new(oid.to_string(), time as i32)))
            .collect())
    }

    fn walk(
        &self,
        repository: &GitRepository,
        seeds: &[Seed],
    ) -> Result<CommitWalker, RepositoryError> {
        CommitWalker::new(
            repository.id,
            &self.local_path(repository)?,
            seeds,
            self.config.walk_refresh_interval,
            self.config.detect_renames,
        )
    }

    fn log_entry(
        &self,
        repository: &GitRepository,
        key: &CommitKey,
    ) -> Result<CommitRecord, RepositoryError> {
        let repo = self.open(repository)?;
        let oid = Oid::from_str(key.hash())
            .map_err(|e| RepositoryError::InvalidRef(format!("{}: {}", key.hash(), e)))?;
        let commit = repo
            .find_commit(oid)
            .map_err(|e| git_error(format!("Commit {} not found", key.hash()), e))?;
        commit_record(&repo, repository.id, &commit, BTreeSet::new(), self.config.detect_renames)
    }
}

/// Local branches as (short name, tip, tip commit time)
///
/// Branches whose name is not UTF-8 or whose target is not a commit are skipped.
pub(crate) fn local_branches(
    repo: &Repository,
) -> Result<Vec<(String, Oid, i64)>, RepositoryError> {
    let branches = repo
        .branches(Some(BranchType::Local))
        .map_err(|e| git_error("Failed to list branches", e))?;

    let mut result = Vec::new();
    for item in branches {
        let (branch, _) = item.map_err(|e| git_error("Failed to read branch", e))?;
        let name = match branch.name() {
            Ok(Some(name)) => name.to_string(),
            _ => {
                log::warn!("Skipping branch with non UTF-8 name");
                continue;
            }
        };
        match branch.get().peel_to_commit() {
            Ok(commit) => result.push((name, commit.id(), commit.time().seconds())),
            Err(e) => log::warn!("Skipping branch {}: {}", name, e),
        }
    }
    Ok(result)
}
