//! Stats command implementation

use anyhow::Result;
use colored::Colorize;
use commitview_index::format_number;

use crate::helpers::{format_size, Workspace};

/// Displays index statistics
pub fn cmd_stats(workspace: &Workspace) -> Result<()> {
    let repositories = workspace.registry.list()?;
    let active = repositories.iter().filter(|r| r.is_active()).count();
    let store = workspace.indexer.store();

    println!("{}", "Index Statistics:".bright_cyan().bold());
    println!("  {}: {}", "Index root".bright_yellow(), workspace.config.index_root.display());
    println!(
        "  {}: {} ({} active)",
        "Repositories".bright_yellow(),
        format_number(repositories.len()).bold(),
        active
    );
    println!("  {}: {}", "Documents".bright_yellow(), format_number(store.document_count()).bold());
    println!("  {}: {}", "Index size".bright_yellow(), format_size(store.size_on_disk()?).bold());
    Ok(())
}
