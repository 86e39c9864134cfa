//! File-level change classification for a single commit

use commitview_core::ChangeFile;
use git2::{
    Commit, Delta, DiffFindOptions, DiffOptions, ObjectType, Repository, TreeWalkMode,
    TreeWalkResult,
};

/// Similarity percentage at which a delete/add pair becomes a rename or copy
const SIMILARITY_THRESHOLD: u16 = 50;

/// Lists the files a commit changed relative to its first parent
///
/// A root commit reports every file of its tree as added. Merge commits are
/// diffed against the first parent only.
pub(crate) fn classify_changes(
    repo: &Repository,
    commit: &Commit<'_>,
    detect_renames: bool,
) -> Result<Vec<ChangeFile>, git2::Error> {
    let tree = commit.tree()?;

    if commit.parent_count() == 0 {
        let mut changes = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() != Some(ObjectType::Tree) {
                let name = String::from_utf8_lossy(entry.name_bytes());
                changes.push(ChangeFile::Added {
                    path: format!("{}{}", root, name),
                });
            }
            TreeWalkResult::Ok
        })?;
        return Ok(changes);
    }

    let parent_tree = commit.parent(0)?.tree()?;
    let mut options = DiffOptions::new();
    options.ignore_submodules(false);
    let mut diff = repo.diff_tree_to_tree(Some(&parent_tree), Some(&tree), Some(&mut options))?;

    if detect_renames {
        let mut find = DiffFindOptions::new();
        find.renames(true)
            .copies(true)
            .rename_threshold(SIMILARITY_THRESHOLD)
            .copy_threshold(SIMILARITY_THRESHOLD);
        diff.find_similar(Some(&mut find))?;
    }

    let mut changes = Vec::with_capacity(diff.deltas().len());
    for delta in diff.deltas() {
        let old_path = delta
            .old_file()
            .path()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let new_path = delta
            .new_file()
            .path()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        let change = match delta.status() {
            Delta::Added => ChangeFile::Added { path: new_path },
            Delta::Modified | Delta::Typechange => ChangeFile::Modified { path: old_path },
            Delta::Deleted => ChangeFile::Deleted { path: old_path },
            Delta::Renamed => ChangeFile::Renamed {
                from: old_path,
                to: new_path,
            },
            Delta::Copied => ChangeFile::Copied {
                from: old_path,
                to: new_path,
            },
            other => {
                log::debug!("Ignoring {:?} delta for {}", other, new_path);
                continue;
            }
        };
        changes.push(change);
    }
    Ok(changes)
}
