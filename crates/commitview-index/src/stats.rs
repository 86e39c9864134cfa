//! Statistics for one reconcile

use std::fmt;
use std::time::Duration;

use crate::formatting::{format_duration, format_number};

/// Outcome counters of a reconcile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Commits produced by the walker
    pub processed: usize,

    /// Commit documents written
    pub indexed: usize,

    /// Commits without any issue key
    pub skipped_no_key: usize,

    /// Commits already indexed with the same branches
    pub skipped_unchanged: usize,

    /// Whether every document of the repository was rebuilt
    pub full_reindex: bool,

    pub elapsed: Duration,
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Commits: {} walked, {} indexed, {} without key, {} unchanged | Mode: {} | Time: {}",
            format_number(self.processed),
            format_number(self.indexed),
            format_number(self.skipped_no_key),
            format_number(self.skipped_unchanged),
            if self.full_reindex { "full" } else { "incremental" },
            format_duration(self.elapsed)
        )
    }
}
