//! Indexer configuration

use std::path::{Path, PathBuf};

use commitview_core::RepoId;

/// Upper bound on hits fetched per query before paging
pub const DEFAULT_MAX_COMMITS: usize = 500;

/// Emitted commits between walker renewals
pub const DEFAULT_WALK_REFRESH_INTERVAL: usize = 10_000;

/// Settings shared by the reconciler, the query engine and the git service
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Root directory holding the index and repository clones
    pub index_root: PathBuf,

    /// Hits fetched per query before paging
    pub max_commits: usize,

    /// Emitted commits between walker renewals (0 disables renewal)
    pub walk_refresh_interval: usize,

    /// Detect renames and copies when classifying changes
    pub detect_renames: bool,
}

impl IndexerConfig {
    pub fn new<P: AsRef<Path>>(index_root: P) -> Self {
        Self {
            index_root: index_root.as_ref().to_path_buf(),
            max_commits: DEFAULT_MAX_COMMITS,
            walk_refresh_interval: DEFAULT_WALK_REFRESH_INTERVAL,
            detect_renames: true,
        }
    }

    /// Location of the commit index
    pub fn index_path(&self) -> PathBuf {
        self.index_root.join("indexes")
    }

    /// Working area of one repository; bare clones live in its `repo` subdirectory
    pub fn repository_dir(&self, id: RepoId) -> PathBuf {
        self.index_root.join(id.to_string())
    }

    pub fn clone_path(&self, id: RepoId) -> PathBuf {
        self.repository_dir(id).join("repo")
    }

    /// Location of the repository registry
    pub fn registry_path(&self) -> PathBuf {
        self.index_root.join("registry")
    }
}
