//! Registry of repositories configured for indexing

use anyhow::{bail, Context, Result};
use commitview_core::{RepoId, Repository, RepositoryError, RepositoryKind, RepositorySource};
use sled::Db;
use std::path::Path;

/// Persistent repository registry (key: repository id, value: JSON descriptor)
pub struct RepositoryRegistry {
    /// Tree storing repository descriptors
    repositories: sled::Tree,

    /// Sled database instance
    db: Db,
}

impl RepositoryRegistry {
    /// Opens or creates a registry at the specified location
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())
            .with_context(|| format!("Failed to open registry at {:?}", path.as_ref()))?;

        let repositories = db
            .open_tree("repositories")
            .context("Failed to open repositories tree")?;

        Ok(Self { repositories, db })
    }

    /// Registers a new repository; fails if the id is already taken
    pub fn add(&self, repository: &Repository) -> Result<()> {
        let key = repository.id().to_string();
        if self.repositories.contains_key(key.as_bytes())? {
            bail!("Repository {} is already registered", key);
        }
        self.store(repository)
    }

    /// Replaces the stored descriptor of an existing repository
    pub fn update(&self, repository: &Repository) -> Result<()> {
        let key = repository.id().to_string();
        if !self.repositories.contains_key(key.as_bytes())? {
            bail!("Repository {} is not registered", key);
        }
        self.store(repository)
    }

    fn store(&self, repository: &Repository) -> Result<()> {
        let key = repository.id().to_string();
        let value = serde_json::to_vec(repository).context("Failed to serialize repository")?;
        self.repositories
            .insert(key.as_bytes(), value)
            .with_context(|| format!("Failed to store repository {}", key))?;
        self.db.flush().context("Failed to flush registry")?;
        Ok(())
    }

    pub fn get(&self, id: RepoId) -> Result<Option<Repository>> {
        match self.repositories.get(id.to_string().as_bytes())? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("Corrupted registry entry for {}", id))?,
            )),
            None => Ok(None),
        }
    }

    /// Removes a repository, returning its last descriptor
    pub fn remove(&self, id: RepoId) -> Result<Option<Repository>> {
        let previous = self.get(id)?;
        self.repositories
            .remove(id.to_string().as_bytes())
            .with_context(|| format!("Failed to remove repository {}", id))?;
        self.db.flush().context("Failed to flush registry")?;
        Ok(previous)
    }

    /// Every registered repository, ordered by display name
    pub fn list(&self) -> Result<Vec<Repository>> {
        let mut repositories = Vec::new();
        for item in self.repositories.iter() {
            let (key, bytes) = item.context("Failed to read registry")?;
            match serde_json::from_slice::<Repository>(&bytes) {
                Ok(repository) => repositories.push(repository),
                Err(e) => log::warn!(
                    "Skipping corrupted registry entry {}: {}",
                    String::from_utf8_lossy(&key),
                    e
                ),
            }
        }
        repositories.sort_by(|a, b| a.display_name().cmp(b.display_name()));
        Ok(repositories)
    }
}

impl RepositorySource for RepositoryRegistry {
    fn get_by_id(&self, id: RepoId) -> Result<Option<Repository>, RepositoryError> {
        self.get(id)
            .map_err(|e| RepositoryError::io("Failed to read repository registry", e))
    }

    fn iterate(&self, kind: RepositoryKind) -> Result<Vec<Repository>, RepositoryError> {
        Ok(self
            .list()
            .map_err(|e| RepositoryError::io("Failed to read repository registry", e))?
            .into_iter()
            .filter(|r| r.kind() == kind)
            .collect())
    }
}
