mod common;

use anyhow::Result;
use commitview_core::{
    BranchTips, CommitKey, CommitRecord, GitRepository, PatternKeyExtractor, RepositoryError, Seed,
};
use commitview_index::{
    CommitIndexer, IndexScheduler, IndexerConfig, IndexingState, RepositoryService,
};
use common::{git_indexer, Fixture, StaticRepositories, T0};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Service whose synchronize blocks until released
struct BlockingService {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl RepositoryService for BlockingService {
    type Walk = std::vec::IntoIter<Result<CommitRecord, RepositoryError>>;

    fn synchronize(&self, _repository: &GitRepository) -> Result<(), RepositoryError> {
        let _ = self.entered.lock().unwrap().send(());
        let _ = self.release.lock().unwrap().recv();
        Ok(())
    }

    fn branch_tips(&self, _repository: &GitRepository) -> Result<BranchTips, RepositoryError> {
        Ok(BranchTips::new())
    }

    fn walk(
        &self,
        _repository: &GitRepository,
        _seeds: &[Seed],
    ) -> Result<Self::Walk, RepositoryError> {
        Ok(Vec::new().into_iter())
    }

    fn log_entry(
        &self,
        _repository: &GitRepository,
        key: &CommitKey,
    ) -> Result<CommitRecord, RepositoryError> {
        Err(RepositoryError::InvalidRef(key.to_string()))
    }
}

fn repository(name: &str, active: bool) -> GitRepository {
    let mut repository = GitRepository::new(name, format!("file:///nonexistent/{}", name));
    repository.active = active;
    repository
}

#[test]
fn test_overlapping_pass_is_skipped() -> Result<()> {
    let root = TempDir::new()?;
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let service = BlockingService {
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    };
    let indexer = Arc::new(CommitIndexer::new(
        IndexerConfig::new(root.path()),
        Arc::new(service),
        Arc::new(PatternKeyExtractor::new()?),
    )?);
    let active = repository("active", true);
    let inactive = repository("inactive", false);
    let repositories = StaticRepositories::with(&[&active, &inactive]);
    let scheduler = Arc::new(IndexScheduler::new(indexer, repositories));

    let background = Arc::clone(&scheduler);
    let pass = thread::spawn(move || background.run_once());

    entered_rx.recv_timeout(Duration::from_secs(10))?;
    assert!(scheduler.run_once()?.is_none());
    release_tx.send(())?;

    let report = pass.join().unwrap()?.expect("first pass runs");
    assert_eq!(report.indexed.len(), 1);
    assert_eq!(report.indexed[0].0, active.id);
    assert_eq!(report.skipped_inactive, 1);
    assert!(report.failed.is_empty());
    Ok(())
}

#[test]
fn test_failing_repository_does_not_stop_the_pass() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.commit("master", "a", "one\n", "GCV-1 initial", T0)?;
    let root = TempDir::new()?;
    let indexer = git_indexer(&root)?;

    let good = fixture.git_repository("a-good");
    let broken = repository("b-broken", true);
    let scheduler = IndexScheduler::new(indexer, StaticRepositories::with(&[&good, &broken]));

    let report = scheduler.run_once()?.expect("pass runs");
    assert_eq!(report.indexed.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, broken.id);
    assert!(!report.cancelled);
    Ok(())
}

#[test]
fn test_cancel_before_a_pass_stops_it_and_is_then_cleared() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.commit("master", "a", "one\n", "GCV-1 initial", T0)?;
    let root = TempDir::new()?;
    let indexer = git_indexer(&root)?;
    let repository = fixture.git_repository("fixture");
    let scheduler = IndexScheduler::new(
        Arc::clone(&indexer),
        StaticRepositories::with(&[&repository]),
    );

    scheduler.cancel();
    let stopped = scheduler.run_once()?.expect("pass runs");
    assert!(stopped.cancelled);
    assert!(stopped.indexed.is_empty());
    assert_eq!(indexer.state(repository.id), IndexingState::Unknown);

    let resumed = scheduler.run_once()?.expect("pass runs");
    assert!(!resumed.cancelled);
    assert_eq!(resumed.indexed.len(), 1);
    assert_eq!(indexer.state(repository.id), IndexingState::InSync);
    Ok(())
}

#[test]
fn test_background_scheduler_indexes_and_stops() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.commit("master", "a", "one\n", "GCV-1 initial", T0)?;
    let root = TempDir::new()?;
    let indexer = git_indexer(&root)?;
    let repository = fixture.git_repository("fixture");

    let scheduler = Arc::new(IndexScheduler::new(
        Arc::clone(&indexer),
        StaticRepositories::with(&[&repository]),
    ));
    let handle = scheduler.spawn(Duration::from_secs(3600));

    let deadline = Instant::now() + Duration::from_secs(30);
    while indexer.state(repository.id) != IndexingState::InSync && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    handle.stop();
    assert_eq!(indexer.state(repository.id), IndexingState::InSync);
    Ok(())
}
