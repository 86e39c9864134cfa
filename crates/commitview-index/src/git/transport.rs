//! Credentials and fetch options for remote repositories

use commitview_core::GitRepository;
use git2::{AutotagOption, Cred, CredentialType, FetchOptions, FetchPrune, RemoteCallbacks};
use std::path::PathBuf;

/// Credential attempts before giving up on a remote
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Callbacks supplying ssh credentials from the configured private key,
/// falling back to the ssh agent and then to libgit2's default credentials
pub(crate) fn remote_callbacks(repository: &GitRepository) -> RemoteCallbacks<'static> {
    let private_key: Option<PathBuf> = repository.private_key_path.clone();
    let mut attempts = 0;

    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, username_from_url, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed: credentials rejected"));
        }

        let username = username_from_url.unwrap_or("git");
        if allowed.contains(CredentialType::SSH_KEY) {
            if let Some(key) = &private_key {
                log::debug!("Using ssh key {:?} for user {}", key, username);
                return Cred::ssh_key(username, None, key, None);
            }
            return Cred::ssh_key_from_agent(username);
        }
        if allowed.contains(CredentialType::USERNAME) {
            return Cred::username(username);
        }
        if allowed.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }
        Err(git2::Error::from_str("no supported credential type"))
    });
    callbacks
}

/// Fetch options mirroring branches and pruning refs deleted upstream
pub(crate) fn fetch_options(repository: &GitRepository) -> FetchOptions<'static> {
    let mut options = FetchOptions::new();
    options
        .remote_callbacks(remote_callbacks(repository))
        .prune(FetchPrune::On)
        .download_tags(AutotagOption::None);
    options
}
