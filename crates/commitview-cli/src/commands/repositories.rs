//! Repository registration commands

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;
use tabled::{Table, settings::{Style, Color, Modify, object::Rows}};

use crate::helpers::Workspace;
use crate::output::RepositoryRow;

/// Registers a repository and reports whether it could be activated
pub fn cmd_add(
    workspace: &Workspace,
    name: &str,
    uri: &str,
    private_key: Option<PathBuf>,
) -> Result<()> {
    let repository = workspace.manager().add(name, uri, private_key)?;
    println!(
        "{} {} ({})",
        "Registered".bright_green(),
        repository.display_name.bold(),
        repository.id
    );
    if !repository.active {
        println!(
            "  {} repository is not reachable yet; run `commitview activate {}` once it is",
            "⚠".yellow(),
            repository.id
        );
    }
    Ok(())
}

pub fn cmd_remove(workspace: &Workspace, repository: &str) -> Result<()> {
    let target = workspace.resolve(repository)?;
    workspace.manager().remove(target.id)?;
    println!("{} {}", "Removed".bright_green(), target.display_name.bold());
    Ok(())
}

pub fn cmd_activate(workspace: &Workspace, repository: &str) -> Result<()> {
    let target = workspace.resolve(repository)?;
    let activated = workspace.manager().activate(target.id)?;
    println!("{} {}", "Activated".bright_green(), activated.display_name.bold());
    Ok(())
}

/// Lists registered repositories
pub fn cmd_list(workspace: &Workspace) -> Result<()> {
    let repositories = workspace.manager().list()?;
    if repositories.is_empty() {
        println!("No repositories registered");
        return Ok(());
    }

    let rows: Vec<RepositoryRow> = repositories
        .iter()
        .filter_map(|r| r.as_git())
        .map(|git| RepositoryRow {
            id: git.id.to_string(),
            name: git.display_name.clone(),
            uri: git.uri.clone(),
            active: if git.active { "yes".to_string() } else { "no".to_string() },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Color::FG_BRIGHT_CYAN));
    println!("{}", table);
    Ok(())
}
