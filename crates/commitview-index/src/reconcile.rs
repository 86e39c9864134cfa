//! Incremental reconciliation of the commit index with repository history
//!
//! A reconcile compares the current branch tips with the tips recorded by
//! the previous reconcile. Moved or new branches seed a walk; a deleted
//! branch forces a full rebuild of the repository's documents. Commit
//! documents and the new tips doc are published in one transaction.

use commitview_core::{
    BranchTips, CommitKey, Error, GitRepository, IndexError, KeyExtractor, RepoId, Seed,
};
use commitview_db::{DocId, IndexReader, IndexStore, IndexWriter};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tantivy::TantivyDocument;

use crate::cancel::CancelFlag;
use crate::config::IndexerConfig;
use crate::git::GitRepositoryService;
use crate::schema::{build_schema, CommitSchema};
use crate::service::RepositoryService;
use crate::stats::IndexStats;

/// Where a repository stands in its indexing lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexingState {
    Unknown,
    Cloned,
    TipsKnown,
    Walking,
    Committing,
    InSync,
}

impl IndexingState {
    /// State to fall back to when a reconcile fails in this state
    fn on_failure(self) -> Self {
        match self {
            IndexingState::Walking | IndexingState::Committing => IndexingState::TipsKnown,
            other => other,
        }
    }
}

impl fmt::Display for IndexingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexingState::Unknown => "unknown",
            IndexingState::Cloned => "cloned",
            IndexingState::TipsKnown => "tips known",
            IndexingState::Walking => "walking",
            IndexingState::Committing => "committing",
            IndexingState::InSync => "in sync",
        };
        f.write_str(name)
    }
}

/// What a reconcile has to walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReindexPlan {
    /// Rebuild every document of the repository
    pub full: bool,

    pub seeds: Vec<Seed>,
}

/// Diffs current branch tips against the previously indexed ones
///
/// A new branch is seeded from its tip, a moved branch from both its old
/// and its new tip. If any previously indexed branch is gone, or
/// `force_full` is set, the plan is a full rebuild seeded from every
/// current tip.
pub fn plan_reindex(current: &BranchTips, prior: &BranchTips, force_full: bool) -> ReindexPlan {
    let full_plan = || ReindexPlan {
        full: true,
        seeds: current
            .iter()
            .map(|(branch, tip)| Seed::new(tip.clone(), branch.clone()))
            .collect(),
    };

    if force_full {
        return full_plan();
    }

    let mut remaining = prior.clone();
    let mut seeds = Vec::new();
    for (branch, tip) in current.iter() {
        match remaining.remove(branch) {
            Some(previous) if previous == *tip => {}
            // Walking from the old tip as well catches resets and rewrites
            Some(previous) => {
                seeds.push(Seed::new(previous, branch.clone()));
                seeds.push(Seed::new(tip.clone(), branch.clone()));
            }
            None => seeds.push(Seed::new(tip.clone(), branch.clone())),
        }
    }

    if !remaining.is_empty() {
        log::info!(
            "Branches deleted since last index ({}), rebuilding",
            remaining.branches().cloned().collect::<Vec<_>>().join(", ")
        );
        return full_plan();
    }

    ReindexPlan { full: false, seeds }
}

/// Keeps the commit index in step with registered repositories
pub struct CommitIndexer<S: RepositoryService = GitRepositoryService> {
    config: IndexerConfig,
    store: IndexStore,
    schema: CommitSchema,
    service: Arc<S>,
    keys: Arc<dyn KeyExtractor>,
    states: Mutex<HashMap<RepoId, IndexingState>>,
}

impl<S: RepositoryService> CommitIndexer<S> {
    /// Opens the index under the configured root, creating it on first use
    pub fn new(
        config: IndexerConfig,
        service: Arc<S>,
        keys: Arc<dyn KeyExtractor>,
    ) -> Result<Self, IndexError> {
        let store = IndexStore::open(config.index_path(), build_schema())?;
        let schema = CommitSchema::new(&store.schema())?;
        Ok(Self {
            config,
            store,
            schema,
            service,
            keys,
            states: Mutex::new(HashMap::new()),
        })
    }

    pub fn index_path(&self) -> PathBuf {
        self.config.index_path()
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn state(&self, id: RepoId) -> IndexingState {
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .copied()
            .unwrap_or(IndexingState::Unknown)
    }

    fn set_state(&self, id: RepoId, state: IndexingState) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let previous = states.insert(id, state);
        if previous != Some(state) {
            log::debug!("Repository {} is now {}", id, state);
        }
    }

    fn fall_back(&self, id: RepoId) {
        let state = self.state(id);
        self.set_state(id, state.on_failure());
    }

    /// Brings the index of `repository` up to date
    pub fn index(
        &self,
        repository: &GitRepository,
        cancel: &CancelFlag,
    ) -> Result<IndexStats, Error> {
        self.update_index(repository, false, cancel)
    }

    /// Reconciles the index with the repository, optionally rebuilding everything
    ///
    /// On any failure, including cancellation, nothing written by this call
    /// becomes visible.
    pub fn update_index(
        &self,
        repository: &GitRepository,
        force_full: bool,
        cancel: &CancelFlag,
    ) -> Result<IndexStats, Error> {
        let start = Instant::now();
        log::info!(
            "Updating index for {} ({}){}",
            repository.display_name,
            repository.id,
            if force_full { " [full]" } else { "" }
        );

        match self.reconcile(repository, force_full, cancel) {
            Ok(mut stats) => {
                stats.elapsed = start.elapsed();
                self.set_state(repository.id, IndexingState::InSync);
                log::info!("Indexed {}: {}", repository.display_name, stats);
                Ok(stats)
            }
            Err(e) => {
                self.fall_back(repository.id);
                Err(e)
            }
        }
    }

    fn reconcile(
        &self,
        repository: &GitRepository,
        force_full: bool,
        cancel: &CancelFlag,
    ) -> Result<IndexStats, Error> {
        let id = repository.id;

        self.service.synchronize(repository)?;
        self.set_state(id, IndexingState::Cloned);

        let current = self.service.branch_tips(repository)?;

        // Holding the writer from here on keeps the recorded tips stable for this reconcile
        let mut writer = self.store.writer()?;
        let prior = self.branch_tips_indexed(id)?;
        self.set_state(id, IndexingState::TipsKnown);

        let plan = plan_reindex(&current, &prior, force_full);
        let mut stats = IndexStats {
            full_reindex: plan.full,
            ..IndexStats::default()
        };

        if let Err(e) = self.apply(repository, &current, &plan, &mut writer, &mut stats, cancel) {
            discard(&mut writer, id);
            log::debug!("Rolled back index update for {}: {}", id, e);
            return Err(e);
        }

        self.set_state(id, IndexingState::Committing);
        if let Err(e) = self.stage_tips(&mut writer, id, &current) {
            discard(&mut writer, id);
            return Err(e.into());
        }
        writer.prepare_commit()?.commit()?;
        Ok(stats)
    }

    fn apply(
        &self,
        repository: &GitRepository,
        current: &BranchTips,
        plan: &ReindexPlan,
        writer: &mut IndexWriter<'_>,
        stats: &mut IndexStats,
        cancel: &CancelFlag,
    ) -> Result<(), Error> {
        let id = repository.id;
        if plan.full {
            writer.delete_by_query(self.schema.repository_query(id))?;
        }
        if plan.seeds.is_empty() {
            log::debug!("No branch of {} moved", id);
            return Ok(());
        }

        self.set_state(id, IndexingState::Walking);
        let scanning: HashSet<&str> = plan
            .seeds
            .iter()
            .flat_map(|seed| seed.branches.iter().map(String::as_str))
            .collect();
        let reader = self.store.reader();
        let walk = self
            .service
            .walk(repository, &plan.seeds)
            .map_err(IndexError::Walk)?;

        for item in walk {
            let mut record = item.map_err(IndexError::Walk)?;
            stats.processed += 1;

            if !self.keys.has_key(&record.message) {
                stats.skipped_no_key += 1;
                continue;
            }

            let previous = self.find_commit_document(&reader, id, &record.key)?;
            if !plan.full {
                if let Some((_, doc)) = &previous {
                    if self.schema.branches_of(doc) == record.branches {
                        stats.skipped_unchanged += 1;
                        continue;
                    }
                }
            }

            writer.delete_by_query(self.schema.commit_query(id, &record.key)?)?;

            // Keep attributions to live branches this walk did not scan
            if let Some((_, doc)) = previous {
                for branch in self.schema.branches_of(&doc) {
                    if current.contains(&branch) && !scanning.contains(branch.as_str()) {
                        record.branches.insert(branch);
                    }
                }
            }

            if cancel.is_cancelled() {
                log::info!("Indexing of {} cancelled", id);
                return Err(IndexError::Cancelled.into());
            }
            log::debug!("Indexing {} on {:?}", record.key, record.branches);
            writer.add_document(self.schema.commit_document(id, &record, self.keys.as_ref()))?;
            stats.indexed += 1;
        }
        Ok(())
    }

    /// Branch tips recorded by the last successful reconcile, empty when never indexed
    pub fn branch_tips_indexed(&self, id: RepoId) -> Result<BranchTips, Error> {
        let reader = self.store.reader();
        let ids = reader.matching(&*self.schema.tips_query(id)?)?;
        if ids.len() > 1 {
            return Err(IndexError::Conflict(format!(
                "{} branch tip documents for repository {}",
                ids.len(),
                id
            ))
            .into());
        }
        let Some(doc_id) = ids.first() else {
            return Ok(BranchTips::new());
        };
        let doc = reader.document(*doc_id)?;
        Ok(self.schema.tips_from_document(&doc)?)
    }

    /// Removes every document of a repository in one transaction
    pub fn remove_entries(&self, id: RepoId) -> Result<(), IndexError> {
        let mut writer = self.store.writer()?;
        writer.delete_by_query(self.schema.repository_query(id))?;
        writer.prepare_commit()?.commit()?;
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        log::info!("Removed index entries of repository {}", id);
        Ok(())
    }

    /// Branches the committed document of one commit is attributed to, if indexed
    pub fn indexed_branches(
        &self,
        id: RepoId,
        key: &CommitKey,
    ) -> Result<Option<BTreeSet<String>>, IndexError> {
        let found = self.find_commit_document(&self.store.reader(), id, key)?;
        Ok(found.map(|(_, doc)| self.schema.branches_of(&doc)))
    }

    /// Looks up the single document of a commit; duplicates are a conflict
    fn find_commit_document(
        &self,
        reader: &IndexReader,
        id: RepoId,
        key: &CommitKey,
    ) -> Result<Option<(DocId, TantivyDocument)>, IndexError> {
        let ids = reader.matching(&*self.schema.commit_query(id, key)?)?;
        if ids.len() > 1 {
            return Err(IndexError::Conflict(format!(
                "{} documents for commit {} in repository {}",
                ids.len(),
                key,
                id
            )));
        }
        match ids.first() {
            Some(doc_id) => Ok(Some((*doc_id, reader.document(*doc_id)?))),
            None => Ok(None),
        }
    }

    /// Replaces the tips doc inside the pending transaction
    fn stage_tips(
        &self,
        writer: &mut IndexWriter<'_>,
        id: RepoId,
        tips: &BranchTips,
    ) -> Result<(), IndexError> {
        self.schema
            .tips_query(id)
            .and_then(|query| writer.delete_by_query(query))
            .and_then(|_| writer.add_document(self.schema.tips_document(id, tips)))
            .map_err(|e| {
                IndexError::Conflict(format!("Failed to stage branch tips for {}: {}", id, e))
            })
    }
}

/// Rolls back a failed reconcile, keeping the original error as the one reported
fn discard(writer: &mut IndexWriter<'_>, id: RepoId) {
    if let Err(e) = writer.rollback() {
        log::warn!("Failed to roll back index update for {}: {}", id, e);
    }
}
