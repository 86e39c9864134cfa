//! Command implementations

mod index;
mod query;
mod repositories;
mod stats;

pub use index::cmd_index;
pub use query::{cmd_issue, cmd_project};
pub use repositories::{cmd_activate, cmd_add, cmd_list, cmd_remove};
pub use stats::cmd_stats;
