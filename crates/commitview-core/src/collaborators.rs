//! Contracts for the issue tracker and repository registry the index talks to

use serde::{Deserialize, Serialize};

use crate::error::RepositoryError;
use crate::models::RepoId;
use crate::repository::{Repository, RepositoryKind};

/// An issue in the tracker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Issue {
    /// Canonical uppercase key, e.g. `GCV-12`
    pub key: String,
}

impl Issue {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into().to_uppercase(),
        }
    }
}

/// The user a query runs on behalf of
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub name: String,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A project release
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub project_key: String,
    pub name: String,
}

impl Version {
    pub fn new(project_key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into().to_uppercase(),
            name: name.into(),
        }
    }
}

/// Resolves issue keys against the tracker
pub trait IssueSource: Send + Sync {
    /// The issue currently holding `key`, if any
    fn get_by_key(&self, key: &str) -> Option<Issue>;

    /// Keys the issue carried before being moved between projects
    fn prior_keys_for(&self, issue: &Issue) -> Vec<String>;
}

/// Resolves which issues belong to a release
pub trait VersionSource: Send + Sync {
    fn issues_with_fix_version(&self, version: &Version) -> Vec<Issue>;

    fn issues_with_affects_version(&self, version: &Version) -> Vec<Issue>;
}

/// Decides whether a user may see commits attached to an issue
pub trait PermissionOracle: Send + Sync {
    fn can_view_commits(&self, issue: &Issue, user: &User) -> bool;
}

/// Registry of repositories to index
pub trait RepositorySource: Send + Sync {
    fn get_by_id(&self, id: RepoId) -> Result<Option<Repository>, RepositoryError>;

    /// Parses a stored repository identifier
    fn parse_id(&self, raw: &str) -> Option<RepoId> {
        raw.parse().ok()
    }

    fn iterate(&self, kind: RepositoryKind) -> Result<Vec<Repository>, RepositoryError>;
}

/// Issue source that treats every syntactically valid key as an existing issue
///
/// Useful when no tracker is attached; prior keys are never known.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyOnlyIssueSource;

impl IssueSource for KeyOnlyIssueSource {
    fn get_by_key(&self, key: &str) -> Option<Issue> {
        if key.trim().is_empty() {
            None
        } else {
            Some(Issue::new(key.trim()))
        }
    }

    fn prior_keys_for(&self, _issue: &Issue) -> Vec<String> {
        Vec::new()
    }
}

/// Without a tracker no issue belongs to any release
impl VersionSource for KeyOnlyIssueSource {
    fn issues_with_fix_version(&self, _version: &Version) -> Vec<Issue> {
        Vec::new()
    }

    fn issues_with_affects_version(&self, _version: &Version) -> Vec<Issue> {
        Vec::new()
    }
}

/// Permission oracle granting every user access to every issue
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionOracle for AllowAll {
    fn can_view_commits(&self, _issue: &Issue, _user: &User) -> bool {
        true
    }
}
