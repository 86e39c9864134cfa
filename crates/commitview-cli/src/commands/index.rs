//! Index command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use commitview_core::{GitRepository, Repository};
use commitview_index::{format_duration, format_number, CancelFlag, IndexScheduler, IndexStats};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, settings::{Style, Color, Modify, object::Rows}};

use crate::helpers::Workspace;
use crate::output::IndexRow;

/// Reconciles the index with one or every active repository
pub fn cmd_index(
    workspace: &Workspace,
    repository: Option<&str>,
    full: bool,
    watch: Option<u64>,
) -> Result<()> {
    if let Some(secs) = watch {
        return watch_index(workspace, Duration::from_secs(secs.max(1)));
    }

    let targets: Vec<GitRepository> = match repository {
        Some(name) => vec![workspace.resolve(name)?],
        None => workspace
            .registry
            .list()?
            .into_iter()
            .filter_map(|r| match r {
                Repository::Git(git) if git.active => Some(git),
                _ => None,
            })
            .collect(),
    };
    if targets.is_empty() {
        println!("No active repositories to index");
        return Ok(());
    }

    let cancel = CancelFlag::new();
    let mut rows = Vec::new();
    let mut failures = 0;
    for target in &targets {
        match workspace.indexer.update_index(target, full, &cancel) {
            Ok(stats) => rows.push(index_row(&target.display_name, &stats)),
            Err(e) => {
                failures += 1;
                eprintln!("{} {}: {}", "✗".red(), target.display_name.bold(), e);
            }
        }
    }

    if !rows.is_empty() {
        let mut table = Table::new(rows);
        table.with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Color::FG_BRIGHT_CYAN));
        println!("{}", table);
    }
    if failures > 0 {
        anyhow::bail!("{} of {} repositories failed to index", failures, targets.len());
    }
    Ok(())
}

fn index_row(name: &str, stats: &IndexStats) -> IndexRow {
    IndexRow {
        repository: name.to_string(),
        processed: format_number(stats.processed),
        indexed: format_number(stats.indexed),
        skipped_no_key: format_number(stats.skipped_no_key),
        skipped_unchanged: format_number(stats.skipped_unchanged),
        mode: if stats.full_reindex { "full" } else { "incremental" }.to_string(),
        elapsed: format_duration(stats.elapsed),
    }
}

/// Runs the scheduler in the background until stdin yields a line or closes
fn watch_index(workspace: &Workspace, interval: Duration) -> Result<()> {
    let scheduler = Arc::new(IndexScheduler::new(
        Arc::clone(&workspace.indexer),
        workspace.registry.clone(),
    ));
    let handle = scheduler.spawn(interval);
    println!(
        "{} every {}; press Enter to stop",
        "Indexing".bright_cyan().bold(),
        format_duration(interval)
    );

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;

    log::info!("Stopping index scheduler");
    handle.stop();
    Ok(())
}
