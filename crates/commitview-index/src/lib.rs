//! Commitview Index - Reconciles git history into the commit index and queries it
//!
//! Main components:
//! - Git repository service (clone, fetch, branch tips, history walk)
//! - Incremental reconciler (`CommitIndexer`)
//! - Query engine with visibility filters
//! - Indexing scheduler

mod cancel;
mod config;
mod filters;
mod formatting;
mod git;
mod manager;
mod query;
mod reconcile;
mod scheduler;
mod schema;
mod service;
mod stats;

pub use cancel::CancelFlag;
pub use config::{IndexerConfig, DEFAULT_MAX_COMMITS, DEFAULT_WALK_REFRESH_INTERVAL};
pub use filters::{PermittedIssuesFilter, ProjectFilter};
pub use formatting::{format_commit_time, format_duration, format_number};
pub use git::{CommitWalker, GitRepositoryService};
pub use manager::RepositoryManager;
pub use query::{Page, QueryEngine};
pub use reconcile::{plan_reindex, CommitIndexer, IndexingState, ReindexPlan};
pub use scheduler::{IndexScheduler, SchedulerHandle, SchedulerReport};
pub use schema::{
    build_schema, CommitSchema, FIELD_AUTHOR, FIELD_BRANCH, FIELD_BRANCH_MAP, FIELD_COMMIT_KEY,
    FIELD_DATE, FIELD_ISSUE_KEY, FIELD_MESSAGE, FIELD_PROJECT_KEY, FIELD_REPOSITORY,
};
pub use service::RepositoryService;
pub use stats::IndexStats;
