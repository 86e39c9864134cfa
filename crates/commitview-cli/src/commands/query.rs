//! Commit lookup commands

use anyhow::Result;
use colored::Colorize;
use commitview_core::{CommitRecord, Issue, User};
use commitview_index::{format_commit_time, Page};
use tabled::{Table, settings::{Style, Color, Modify, object::Rows}};

use crate::helpers::{summary, truncate, Workspace};
use crate::output::CommitRow;

const MESSAGE_WIDTH: usize = 60;

/// Shows commits referencing an issue
pub fn cmd_issue(workspace: &Workspace, key: &str, page: Page, files: bool) -> Result<()> {
    let issue = Issue::new(key);
    let records = workspace.query_engine()?.by_issue(&issue, page)?;
    print_commits(&issue.key, &records, page);

    if files {
        for record in &records {
            println!("\n{} {}", "●".bright_cyan(), record.key.short_hash().bold());
            for change in &record.changes {
                println!("  {}", change);
            }
        }
    }
    Ok(())
}

/// Shows commits referencing any issue of a project
pub fn cmd_project(workspace: &Workspace, key: &str, user: &str, page: Page) -> Result<()> {
    let project = key.to_uppercase();
    let records = workspace
        .query_engine()?
        .by_project(&project, &User::new(user), page)?;
    print_commits(&project, &records, page);
    Ok(())
}

fn print_commits(subject: &str, records: &[CommitRecord], page: Page) {
    if records.is_empty() {
        println!("No commits found for {} (page {})", subject.bold(), page.number);
        return;
    }

    println!(
        "\n{} {} (page {}, {} shown)",
        "Commits for".bright_cyan(),
        subject.bold(),
        page.number,
        records.len()
    );
    let rows: Vec<CommitRow> = records
        .iter()
        .map(|record| CommitRow {
            commit: record.key.short_hash().to_string(),
            date: format_commit_time(record.timestamp),
            author: record.author.clone(),
            branches: record.branches.iter().cloned().collect::<Vec<_>>().join(", "),
            message: truncate(summary(&record.message), MESSAGE_WIDTH),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Color::FG_BRIGHT_CYAN));
    println!("{}", table);
}
