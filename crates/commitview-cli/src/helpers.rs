//! Helper functions for CLI operations

use anyhow::{Context, Result};
use commitview_core::{
    AllowAll, GitRepository, KeyOnlyIssueSource, PatternKeyExtractor, RepoId, Repository,
};
use commitview_db::RepositoryRegistry;
use commitview_index::{
    CommitIndexer, GitRepositoryService, IndexerConfig, QueryEngine, RepositoryManager,
};
use std::path::Path;
use std::sync::Arc;

/// Everything the commands need, opened under one index root
pub struct Workspace {
    pub config: IndexerConfig,
    pub registry: Arc<RepositoryRegistry>,
    pub indexer: Arc<CommitIndexer>,
}

impl Workspace {
    pub fn open(index_root: &Path) -> Result<Self> {
        std::fs::create_dir_all(index_root)
            .with_context(|| format!("Failed to create index root {:?}", index_root))?;

        let config = IndexerConfig::new(index_root);
        let registry = Arc::new(RepositoryRegistry::open(config.registry_path())?);
        let service = Arc::new(GitRepositoryService::new(config.clone()));
        let keys = Arc::new(PatternKeyExtractor::new().context("Invalid issue key pattern")?);
        let indexer = Arc::new(
            CommitIndexer::new(config.clone(), service, keys)
                .with_context(|| format!("Failed to open index at {:?}", config.index_path()))?,
        );

        Ok(Self {
            config,
            registry,
            indexer,
        })
    }

    pub fn manager(&self) -> RepositoryManager {
        RepositoryManager::new(Arc::clone(&self.registry), Arc::clone(&self.indexer))
    }

    /// Query engine without an issue tracker: every key exists and is visible
    pub fn query_engine(&self) -> Result<QueryEngine> {
        Ok(QueryEngine::new(
            self.indexer.store().clone(),
            Arc::clone(self.indexer.service()),
            self.registry.clone(),
            Arc::new(KeyOnlyIssueSource),
            Arc::new(KeyOnlyIssueSource),
            Arc::new(AllowAll),
            self.config.max_commits,
        )?)
    }

    /// Finds a registered repository by id or display name
    pub fn resolve(&self, repository: &str) -> Result<GitRepository> {
        if let Ok(id) = repository.parse::<RepoId>() {
            return self.manager().git_repository(id);
        }
        self.registry
            .list()?
            .into_iter()
            .find_map(|r| match r {
                Repository::Git(git) if git.display_name == repository => Some(git),
                _ => None,
            })
            .with_context(|| format!("No repository named {}", repository))
    }
}

/// Formats a byte count with a binary unit
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// First line of a commit message
pub fn summary(message: &str) -> &str {
    message.lines().next().unwrap_or("").trim()
}

/// Shortens text to `max` characters, marking the cut
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_summary_takes_first_line() {
        assert_eq!(summary("GCV-1 fix\n\nlong body"), "GCV-1 fix");
        assert_eq!(summary(""), "");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer message", 8), "a longe…");
    }
}
