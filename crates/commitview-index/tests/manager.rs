mod common;

use anyhow::Result;
use commitview_core::{CommitKey, GitRepository, RepositoryError};
use commitview_db::RepositoryRegistry;
use commitview_index::{CancelFlag, GitRepositoryService, IndexerConfig, RepositoryManager};
use common::{git_indexer, Fixture, T0};
use std::sync::Arc;
use tempfile::TempDir;

fn manager(root: &TempDir) -> Result<RepositoryManager> {
    let indexer = git_indexer(root)?;
    let registry = Arc::new(RepositoryRegistry::open(indexer.config().registry_path())?);
    Ok(RepositoryManager::new(registry, indexer))
}

#[test]
fn test_add_activates_reachable_repository() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.commit("master", "a", "one\n", "GCV-1 initial", T0)?;
    let root = TempDir::new()?;
    let manager = manager(&root)?;

    let uri = format!("file://{}", fixture.path.display());
    let added = manager.add("fixture", &uri, None)?;
    assert!(added.active);
    assert_eq!(manager.git_repository(added.id)?, added);
    assert_eq!(manager.list()?.len(), 1);
    Ok(())
}

#[test]
fn test_unreachable_repository_is_registered_inactive() -> Result<()> {
    let root = TempDir::new()?;
    let scratch = TempDir::new()?;
    let manager = manager(&root)?;

    let path = scratch.path().join("later");
    let uri = format!("file://{}", path.display());
    let added = manager.add("later", &uri, None)?;
    assert!(!added.active);

    assert!(manager.activate(added.id).is_err());
    assert!(!manager.git_repository(added.id)?.active);

    GitRepositoryService::new(IndexerConfig::new(root.path())).create(&added)?;
    let activated = manager.activate(added.id)?;
    assert!(activated.active);
    assert!(manager.git_repository(added.id)?.active);
    Ok(())
}

#[test]
fn test_malformed_uri_is_rejected() -> Result<()> {
    let root = TempDir::new()?;
    let manager = manager(&root)?;

    assert!(manager.add("broken", "not a location", None).is_err());
    assert!(manager.list()?.is_empty());
    Ok(())
}

#[test]
fn test_only_local_repositories_can_be_created() -> Result<()> {
    let root = TempDir::new()?;
    let service = GitRepositoryService::new(IndexerConfig::new(root.path()));
    let remote = GitRepository::new("remote", "https://example.com/repo.git");
    assert!(matches!(
        service.create(&remote),
        Err(RepositoryError::MalformedUri(_))
    ));
    Ok(())
}

#[test]
fn test_remove_drops_registration_and_index_entries() -> Result<()> {
    let fixture = Fixture::new()?;
    let c1 = fixture.commit("master", "a", "one\n", "GCV-1 initial", T0)?;
    let root = TempDir::new()?;
    let indexer = git_indexer(&root)?;
    let registry = Arc::new(RepositoryRegistry::open(indexer.config().registry_path())?);
    let manager = RepositoryManager::new(registry, Arc::clone(&indexer));

    let uri = format!("file://{}", fixture.path.display());
    let added = manager.add("fixture", &uri, None)?;
    indexer.index(&added, &CancelFlag::new())?;
    let key = CommitKey::new(c1.to_string(), T0 as i32);
    assert!(indexer.indexed_branches(added.id, &key)?.is_some());

    let removed = manager.remove(added.id)?;
    assert!(removed.is_some());
    assert!(manager.get(added.id)?.is_none());
    assert!(indexer.indexed_branches(added.id, &key)?.is_none());
    assert!(fixture.path.exists());
    Ok(())
}
