//! Commitview Core - Shared models, errors and collaborator contracts
//!
//! This crate defines the data structures exchanged between the index store,
//! the reconciler and the query engine: commit keys, commit records, branch
//! tips, repository descriptors, plus the traits through which the issue
//! tracker and repository registry are reached.

mod collaborators;
mod error;
mod keys;
mod models;
mod repository;

pub use collaborators::{
    AllowAll, Issue, IssueSource, KeyOnlyIssueSource, PermissionOracle, RepositorySource, User,
    Version, VersionSource,
};
pub use error::{BoxError, Error, IndexError, MalformedKey, RepositoryError};
pub use keys::{project_key, KeyExtractor, PatternKeyExtractor, DEFAULT_KEY_PATTERN};
pub use models::{BranchTips, ChangeFile, CommitKey, CommitRecord, RepoId, Seed};
pub use repository::{GitRepository, Repository, RepositoryKind, RepositoryUri};
