//! Commitview CLI - Binds git commits to issue keys
//!
//! Provides:
//! - Registration of repositories to index
//! - One-shot and periodic indexing
//! - Commit lookups by issue and project

mod commands;
mod helpers;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commitview_index::Page;
use std::path::PathBuf;

use commands::{
    cmd_activate, cmd_add, cmd_index, cmd_issue, cmd_list, cmd_project, cmd_remove, cmd_stats,
};
use helpers::Workspace;

#[derive(Parser)]
#[command(name = "commitview")]
#[command(about = "Indexes git history by the issue keys in commit messages", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the index, the registry and repository clones
    #[arg(short = 'r', long, default_value = "./commitview-data")]
    index_root: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Registers a repository for indexing
    Add {
        /// Display name
        name: String,

        /// Location: file:// path, ssh, git or http(s) URL
        uri: String,

        /// Private key for ssh remotes
        #[arg(long)]
        private_key: Option<PathBuf>,
    },

    /// Unregisters a repository and drops its index entries
    Remove {
        /// Repository id or display name
        repository: String,
    },

    /// Re-checks that a repository is reachable and marks it active
    Activate {
        /// Repository id or display name
        repository: String,
    },

    /// Lists registered repositories
    List,

    /// Brings the index up to date with every active repository
    Index {
        /// Only this repository (id or display name)
        #[arg(long)]
        repository: Option<String>,

        /// Rebuild instead of updating incrementally
        #[arg(long)]
        full: bool,

        /// Keep indexing every SECS seconds until Enter is pressed
        #[arg(long, value_name = "SECS", conflicts_with = "full")]
        watch: Option<u64>,
    },

    /// Shows commits referencing an issue
    Issue {
        /// Issue key (e.g., "GCV-12")
        key: String,

        #[command(flatten)]
        paging: PageArgs,

        /// List changed files of each commit
        #[arg(long)]
        files: bool,
    },

    /// Shows commits referencing any issue of a project
    Project {
        /// Project key (e.g., "GCV")
        key: String,

        /// User the query runs for
        #[arg(short, long, default_value = "cli")]
        user: String,

        #[command(flatten)]
        paging: PageArgs,
    },

    /// Show index statistics
    Stats,
}

#[derive(clap::Args)]
struct PageArgs {
    /// Page number, starting at 0
    #[arg(short, long, default_value = "0")]
    page: usize,

    /// Commits per page
    #[arg(short = 'n', long, default_value = "20")]
    page_size: usize,

    /// Oldest commits first
    #[arg(long)]
    ascending: bool,
}

impl PageArgs {
    fn page(&self) -> Page {
        Page::new(self.page, self.page_size).ascending(self.ascending)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&cli.log_level)
    ).init();

    let workspace = Workspace::open(&cli.index_root)?;

    match cli.command {
        Commands::Add { name, uri, private_key } => cmd_add(&workspace, &name, &uri, private_key)?,
        Commands::Remove { repository } => cmd_remove(&workspace, &repository)?,
        Commands::Activate { repository } => cmd_activate(&workspace, &repository)?,
        Commands::List => cmd_list(&workspace)?,
        Commands::Index { repository, full, watch } => {
            cmd_index(&workspace, repository.as_deref(), full, watch)?;
        }
        Commands::Issue { key, paging, files } => {
            cmd_issue(&workspace, &key, paging.page(), files)?
        }
        Commands::Project { key, user, paging } => {
            cmd_project(&workspace, &key, &user, paging.page())?;
        }
        Commands::Stats => cmd_stats(&workspace)?,
    }

    Ok(())
}
