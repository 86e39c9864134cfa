//! Version-control capabilities the reconciler and query engine rely on

use commitview_core::{BranchTips, CommitKey, CommitRecord, GitRepository, RepositoryError, Seed};

/// Per-kind repository access
pub trait RepositoryService: Send + Sync {
    /// Walk produced by [`RepositoryService::walk`]
    type Walk: Iterator<Item = Result<CommitRecord, RepositoryError>>;

    /// Makes the repository history available locally and current with its remote
    fn synchronize(&self, repository: &GitRepository) -> Result<(), RepositoryError>;

    /// Current local branch tips
    fn branch_tips(&self, repository: &GitRepository) -> Result<BranchTips, RepositoryError>;

    /// Walks history from `seeds`, or from every branch tip when empty
    fn walk(
        &self,
        repository: &GitRepository,
        seeds: &[Seed],
    ) -> Result<Self::Walk, RepositoryError>;

    /// Loads one commit with its changes; `branches` is left empty
    fn log_entry(
        &self,
        repository: &GitRepository,
        key: &CommitKey,
    ) -> Result<CommitRecord, RepositoryError>;
}
