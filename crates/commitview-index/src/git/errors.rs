//! Mapping of libgit2 failures onto `RepositoryError`

use commitview_core::RepositoryError;
use git2::{ErrorClass, ErrorCode};

/// Classifies a git2 error, keeping it as the source
pub(crate) fn git_error(message: impl Into<String>, err: git2::Error) -> RepositoryError {
    let message = message.into();
    match (err.code(), err.class()) {
        (ErrorCode::NotFound, _) => RepositoryError::missing_object(message, err),
        (ErrorCode::InvalidSpec, _) => RepositoryError::InvalidRef(format!("{}: {}", message, err)),
        (ErrorCode::Auth | ErrorCode::Certificate, _)
        | (_, ErrorClass::Net | ErrorClass::Ssh | ErrorClass::Ssl | ErrorClass::Http) => {
            RepositoryError::transport(message, err)
        }
        (ErrorCode::BareRepo | ErrorCode::UnbornBranch | ErrorCode::Locked, _) => {
            RepositoryError::WrongState(format!("{}: {}", message, err))
        }
        _ => RepositoryError::io(message, err),
    }
}
