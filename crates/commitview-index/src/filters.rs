//! Visibility filters applied to query hits

use commitview_core::{IndexError, IssueSource, PermissionOracle, User};
use commitview_db::{DocFilter, DocId, IndexReader};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use tantivy::schema::{Field, Value};

/// Admits a commit when the user may see at least one of its issues
///
/// Verdicts are cached per issue key for the lifetime of the filter.
pub struct ProjectFilter<'a> {
    issue_key: Field,
    issues: &'a dyn IssueSource,
    permissions: &'a dyn PermissionOracle,
    user: &'a User,
    verdicts: RefCell<HashMap<String, bool>>,
}

impl<'a> ProjectFilter<'a> {
    pub fn new(
        issue_key: Field,
        issues: &'a dyn IssueSource,
        permissions: &'a dyn PermissionOracle,
        user: &'a User,
    ) -> Self {
        Self {
            issue_key,
            issues,
            permissions,
            user,
            verdicts: RefCell::new(HashMap::new()),
        }
    }

    fn visible(&self, key: &str) -> bool {
        if let Some(verdict) = self.verdicts.borrow().get(key) {
            return *verdict;
        }
        let verdict = self
            .issues
            .get_by_key(key)
            .is_some_and(|issue| self.permissions.can_view_commits(&issue, self.user));
        self.verdicts.borrow_mut().insert(key.to_string(), verdict);
        verdict
    }
}

impl DocFilter for ProjectFilter<'_> {
    fn accept(&self, reader: &IndexReader, doc: DocId) -> Result<bool, IndexError> {
        Ok(reader
            .document(doc)?
            .get_all(self.issue_key)
            .filter_map(|v| v.as_str())
            .any(|key| self.visible(key)))
    }
}

/// Admits a commit when one of its issue keys is in a precomputed set
pub struct PermittedIssuesFilter {
    issue_key: Field,
    keys: HashSet<String>,
}

impl PermittedIssuesFilter {
    pub fn new<I: IntoIterator<Item = String>>(issue_key: Field, keys: I) -> Self {
        Self {
            issue_key,
            keys: keys.into_iter().map(|k| k.to_uppercase()).collect(),
        }
    }
}

impl DocFilter for PermittedIssuesFilter {
    fn accept(&self, reader: &IndexReader, doc: DocId) -> Result<bool, IndexError> {
        Ok(reader
            .document(doc)?
            .get_all(self.issue_key)
            .filter_map(|v| v.as_str())
            .any(|key| self.keys.contains(key)))
    }
}
