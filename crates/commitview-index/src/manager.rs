//! Repository lifecycle: registration, activation and removal

use anyhow::{Context, Result};
use commitview_core::{GitRepository, RepoId, Repository};
use commitview_db::RepositoryRegistry;
use std::path::PathBuf;
use std::sync::Arc;

use crate::git::GitRepositoryService;
use crate::reconcile::CommitIndexer;

/// Coordinates the registry, the git service and the index for one repository at a time
pub struct RepositoryManager {
    registry: Arc<RepositoryRegistry>,
    indexer: Arc<CommitIndexer<GitRepositoryService>>,
}

impl RepositoryManager {
    pub fn new(
        registry: Arc<RepositoryRegistry>,
        indexer: Arc<CommitIndexer<GitRepositoryService>>,
    ) -> Self {
        Self { registry, indexer }
    }

    fn service(&self) -> &GitRepositoryService {
        self.indexer.service()
    }

    /// Registers a repository and tries to activate it
    ///
    /// A repository that cannot be reached is still registered, inactive.
    pub fn add(
        &self,
        display_name: &str,
        uri: &str,
        private_key: Option<PathBuf>,
    ) -> Result<GitRepository> {
        let mut repository = GitRepository::new(display_name, uri);
        repository.private_key_path = private_key;
        repository
            .location()
            .with_context(|| format!("Cannot register {}", display_name))?;

        if let Err(e) = self.service().activate(&mut repository) {
            log::warn!("Repository {} registered inactive: {}", display_name, e);
        }
        self.registry
            .add(&Repository::Git(repository.clone()))
            .with_context(|| format!("Failed to register {}", display_name))?;
        Ok(repository)
    }

    /// Re-validates a registered repository and stores its new active flag
    pub fn activate(&self, id: RepoId) -> Result<GitRepository> {
        let mut repository = self.git_repository(id)?;
        let result = self.service().activate(&mut repository);
        self.registry.update(&Repository::Git(repository.clone()))?;
        result.with_context(|| format!("Failed to activate {}", repository.display_name))?;
        Ok(repository)
    }

    /// Unregisters a repository, dropping its index entries and working area
    ///
    /// Failures to clean the index are logged; the repository is removed regardless.
    pub fn remove(&self, id: RepoId) -> Result<Option<Repository>> {
        if let Err(e) = self.indexer.remove_entries(id) {
            log::error!("Failed to remove index entries of {}: {}", id, e);
        }
        self.service()
            .remove(id)
            .with_context(|| format!("Failed to remove working area of {}", id))?;
        self.registry.remove(id)
    }

    pub fn get(&self, id: RepoId) -> Result<Option<Repository>> {
        self.registry.get(id)
    }

    pub fn list(&self) -> Result<Vec<Repository>> {
        self.registry.list()
    }

    pub fn git_repository(&self, id: RepoId) -> Result<GitRepository> {
        match self.registry.get(id)? {
            Some(Repository::Git(git)) => Ok(git),
            None => anyhow::bail!("Repository {} is not registered", id),
        }
    }
}
