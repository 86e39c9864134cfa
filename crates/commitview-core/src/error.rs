//! Error taxonomy shared by every commitview crate
//!
//! Storage failures surface as [`IndexError`], version-control failures as
//! [`RepositoryError`]. [`Error`] is the umbrella returned by the public
//! reconcile and query entry points.

use crate::models::RepoId;

/// Boxed cause carried by IO-like variants
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the commit index store and the reconciler
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Index IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: BoxError,
    },

    #[error("Index is corrupt: {0}")]
    Corrupt(String),

    #[error("Index conflict: {0}")]
    Conflict(String),

    #[error("Index not initialized: {0}")]
    NotInitialized(String),

    #[error("Indexing was cancelled")]
    Cancelled,

    #[error("Query has {count} clauses, limit is {limit}")]
    TooManyClauses { count: usize, limit: usize },

    #[error("Failed walking repository history: {0}")]
    Walk(#[from] RepositoryError),
}

impl IndexError {
    /// Wraps a lower-level failure as an IO error with context
    pub fn io<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        IndexError::Io {
            message: message.into(),
            source: source.into(),
        }
    }
}

/// Errors raised by the version-control layer
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Repository IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: BoxError,
    },

    #[error("Malformed repository URI: {0}")]
    MalformedUri(String),

    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: BoxError,
    },

    #[error("Missing object: {message}")]
    MissingObject {
        message: String,
        #[source]
        source: BoxError,
    },

    #[error("Invalid reference: {0}")]
    InvalidRef(String),

    #[error("Repository is in the wrong state: {0}")]
    WrongState(String),
}

impl RepositoryError {
    pub fn io<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        RepositoryError::Io {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn transport<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        RepositoryError::Transport {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn missing_object<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        RepositoryError::MissingObject {
            message: message.into(),
            source: source.into(),
        }
    }
}

/// A marshalled commit key or branch-tip entry that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed commit key: {0:?}")]
pub struct MalformedKey(pub String);

/// Umbrella error for the public indexing and query API
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    MalformedKey(#[from] MalformedKey),

    #[error("Access to repository {0} was denied")]
    PermissionDenied(RepoId),
}

impl Error {
    /// True when the failure came from cooperative cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Index(IndexError::Cancelled))
    }
}
