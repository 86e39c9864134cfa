//! Repository descriptors registered for indexing

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::RepositoryError;
use crate::models::RepoId;

/// Kind of version-control system behind a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryKind {
    Git,
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryKind::Git => f.write_str("git"),
        }
    }
}

/// A registered repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Repository {
    Git(GitRepository),
}

impl Repository {
    pub fn id(&self) -> RepoId {
        match self {
            Repository::Git(git) => git.id,
        }
    }

    pub fn kind(&self) -> RepositoryKind {
        match self {
            Repository::Git(_) => RepositoryKind::Git,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Repository::Git(git) => &git.display_name,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Repository::Git(git) => git.active,
        }
    }

    pub fn as_git(&self) -> Option<&GitRepository> {
        match self {
            Repository::Git(git) => Some(git),
        }
    }
}

/// Git repository settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRepository {
    pub id: RepoId,

    pub display_name: String,

    /// Clone URI; `file://` URIs are read in place
    pub uri: String,

    /// SSH private key used for remote transports
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    /// Only active repositories are indexed by the scheduler
    #[serde(default)]
    pub active: bool,
}

impl GitRepository {
    pub fn new(display_name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: RepoId::new(),
            display_name: display_name.into(),
            uri: uri.into(),
            private_key_path: None,
            active: false,
        }
    }

    pub fn location(&self) -> Result<RepositoryUri, RepositoryError> {
        RepositoryUri::parse(&self.uri)
    }
}

impl From<GitRepository> for Repository {
    fn from(git: GitRepository) -> Self {
        Repository::Git(git)
    }
}

/// Where a repository lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryUri {
    /// Local repository opened in place
    File(PathBuf),

    /// Remote repository mirrored into a bare clone
    Remote(String),
}

const REMOTE_SCHEMES: &[&str] = &["ssh", "git", "http", "https", "git+ssh", "ssh+git"];

impl RepositoryUri {
    /// Classifies a clone URI
    ///
    /// Accepts `file://` URIs and bare absolute paths as local, the usual git
    /// transports and scp-like `user@host:path` as remote.
    pub fn parse(uri: &str) -> Result<Self, RepositoryError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(RepositoryError::MalformedUri(uri.to_string()));
        }

        if let Some(path) = uri.strip_prefix("file://") {
            if path.is_empty() {
                return Err(RepositoryError::MalformedUri(uri.to_string()));
            }
            return Ok(RepositoryUri::File(PathBuf::from(path)));
        }

        if let Some((scheme, rest)) = uri.split_once("://") {
            let scheme = scheme.to_ascii_lowercase();
            if !REMOTE_SCHEMES.contains(&scheme.as_str()) || rest.is_empty() {
                return Err(RepositoryError::MalformedUri(uri.to_string()));
            }
            return Ok(RepositoryUri::Remote(uri.to_string()));
        }

        if uri.starts_with('/') {
            return Ok(RepositoryUri::File(PathBuf::from(uri)));
        }

        // scp-like syntax: [user@]host:path
        match uri.split_once(':') {
            Some((host, path)) if !host.is_empty() && !path.is_empty() && !host.contains('/') => {
                Ok(RepositoryUri::Remote(uri.to_string()))
            }
            _ => Err(RepositoryError::MalformedUri(uri.to_string())),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, RepositoryUri::File(_))
    }
}
