//! Output formatting structures for CLI display

use tabled::Tabled;

/// Table row for a registered repository
#[derive(Tabled)]
pub struct RepositoryRow {
    #[tabled(rename = "Id")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Location")]
    pub uri: String,
    #[tabled(rename = "Active")]
    pub active: String,
}

/// Table row for a commit hit
#[derive(Tabled)]
pub struct CommitRow {
    #[tabled(rename = "Commit")]
    pub commit: String,
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Author")]
    pub author: String,
    #[tabled(rename = "Branches")]
    pub branches: String,
    #[tabled(rename = "Message")]
    pub message: String,
}

/// Table row for the outcome of one reconcile
#[derive(Tabled)]
pub struct IndexRow {
    #[tabled(rename = "Repository")]
    pub repository: String,
    #[tabled(rename = "Walked")]
    pub processed: String,
    #[tabled(rename = "Indexed")]
    pub indexed: String,
    #[tabled(rename = "No key")]
    pub skipped_no_key: String,
    #[tabled(rename = "Unchanged")]
    pub skipped_unchanged: String,
    #[tabled(rename = "Mode")]
    pub mode: String,
    #[tabled(rename = "Time")]
    pub elapsed: String,
}
