//! Periodic indexing of every active repository

use commitview_core::{Error, RepoId, RepositoryKind, RepositorySource};
use std::sync::{Arc, Mutex, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::cancel::CancelFlag;
use crate::git::GitRepositoryService;
use crate::reconcile::CommitIndexer;
use crate::service::RepositoryService;
use crate::stats::IndexStats;

/// Granularity at which a sleeping scheduler notices a stop request
const STOP_POLL: Duration = Duration::from_millis(200);

/// Result of one pass over the registry
#[derive(Debug, Default)]
pub struct SchedulerReport {
    pub indexed: Vec<(RepoId, IndexStats)>,
    pub failed: Vec<(RepoId, String)>,
    pub skipped_inactive: usize,
    pub cancelled: bool,
}

/// Runs reconciles for registered repositories, one pass at a time
pub struct IndexScheduler<S: RepositoryService = GitRepositoryService> {
    indexer: Arc<CommitIndexer<S>>,
    repositories: Arc<dyn RepositorySource>,
    running: Mutex<()>,
    cancel: CancelFlag,
}

impl<S: RepositoryService + 'static> IndexScheduler<S> {
    pub fn new(indexer: Arc<CommitIndexer<S>>, repositories: Arc<dyn RepositorySource>) -> Self {
        Self {
            indexer,
            repositories,
            running: Mutex::new(()),
            cancel: CancelFlag::new(),
        }
    }

    /// Indexes every active repository in turn
    ///
    /// Returns `None` without doing anything when another pass is in progress.
    /// A failing repository is logged and the pass moves on.
    pub fn run_once(&self) -> Result<Option<SchedulerReport>, Error> {
        let _running = match self.running.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                log::info!("Index update already in progress, skipping");
                return Ok(None);
            }
        };

        let report = self.pass();
        // Cleared only once the pass is over, so a stop sent before it started still lands
        self.cancel.reset();
        report.map(Some)
    }

    fn pass(&self) -> Result<SchedulerReport, Error> {
        let mut report = SchedulerReport::default();
        for repository in self.repositories.iterate(RepositoryKind::Git)? {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let Some(git) = repository.as_git() else {
                continue;
            };
            if !git.active {
                log::debug!("Skipping inactive repository {}", git.display_name);
                report.skipped_inactive += 1;
                continue;
            }

            match self.indexer.index(git, &self.cancel) {
                Ok(stats) => report.indexed.push((git.id, stats)),
                Err(e) if e.is_cancelled() => {
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    log::error!("Failed to index {} ({}): {}", git.display_name, git.id, e);
                    report.failed.push((git.id, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Requests the running pass, or the next one if none is running, to stop
    /// at the next commit boundary
    ///
    /// The pass after the stopped one starts afresh.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Runs a pass every `interval` on a background thread until stopped
    pub fn spawn(self: Arc<Self>, interval: Duration) -> SchedulerHandle<S> {
        let stop = CancelFlag::new();
        let thread_stop = stop.clone();
        let scheduler = Arc::clone(&self);

        let thread = thread::spawn(move || {
            while !thread_stop.is_cancelled() {
                match scheduler.run_once() {
                    Ok(Some(report)) => log::info!(
                        "Index pass finished: {} indexed, {} failed, {} inactive",
                        report.indexed.len(),
                        report.failed.len(),
                        report.skipped_inactive
                    ),
                    Ok(None) => {}
                    Err(e) => log::error!("Index pass failed: {}", e),
                }

                let next = Instant::now() + interval;
                while !thread_stop.is_cancelled() && Instant::now() < next {
                    thread::sleep(STOP_POLL.min(next.saturating_duration_since(Instant::now())));
                }
            }
            log::debug!("Index scheduler stopped");
        });

        SchedulerHandle {
            stop,
            scheduler: self,
            thread,
        }
    }
}

/// Handle of a background scheduler
pub struct SchedulerHandle<S: RepositoryService + 'static = GitRepositoryService> {
    stop: CancelFlag,
    scheduler: Arc<IndexScheduler<S>>,
    thread: JoinHandle<()>,
}

impl<S: RepositoryService + 'static> SchedulerHandle<S> {
    /// Cancels any pass in progress and waits for the thread to finish
    pub fn stop(self) {
        self.stop.cancel();
        self.scheduler.cancel();
        if self.thread.join().is_err() {
            log::error!("Index scheduler thread panicked");
        }
    }
}
