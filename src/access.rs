//! Connection-time enforcement behind every restricted entry.
//!
//! When a client connects, sshd runs the configured access-control binary
//! with the key owner's identifier as its argument and the client's original
//! request in `SSH_ORIGINAL_COMMAND`.  This module implements that binary's
//! logic: parse the request, authorize it against fresh records, and exec
//! the underlying git service.  Anything unexpected fails closed.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::perm::{self, AccessLevel};
use crate::records::{RecordStore, RepositoryRecord};

// ---------------------------------------------------------------------------
// Git services
// ---------------------------------------------------------------------------

/// The two git transport services reachable over SSH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitService {
    UploadPack,
    ReceivePack,
}

impl GitService {
    /// Subcommand passed to the `git` binary.
    pub fn subcommand(&self) -> &'static str {
        match self {
            GitService::UploadPack => "upload-pack",
            GitService::ReceivePack => "receive-pack",
        }
    }

    /// Fetching needs read access, pushing needs write access.
    pub fn required_access(&self) -> AccessLevel {
        match self {
            GitService::UploadPack => AccessLevel::Read,
            GitService::ReceivePack => AccessLevel::Write,
        }
    }
}

/// A parsed client request: which service, against which repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRequest {
    pub service: GitService,
    pub repository: String,
}

// ---------------------------------------------------------------------------
// Command parsing
// ---------------------------------------------------------------------------

/// Parse the client's original command, e.g.:
///
/// ```text
/// git-upload-pack 'core.git'
/// git-receive-pack /core
/// ```
///
/// The repository name is normalised (surrounding quotes, leading `/`, and
/// the `.git` suffix stripped) and then held to a strict grammar: ASCII
/// alphanumerics, `.`, `-`, and `_`, not starting with a dot.  A name is
/// later joined onto the repository root, so nothing that could traverse
/// outside it is accepted.
pub fn parse_original_command(command: &str) -> Result<GitRequest> {
    let command = command.trim();
    let (service, rest) = if let Some(rest) = command.strip_prefix("git-upload-pack") {
        (GitService::UploadPack, rest)
    } else if let Some(rest) = command.strip_prefix("git-receive-pack") {
        (GitService::ReceivePack, rest)
    } else {
        return Err(Error::Validation(format!(
            "unrecognised command {command:?}; only git-upload-pack and \
             git-receive-pack are served",
        )));
    };

    if !rest.starts_with(char::is_whitespace) {
        return Err(Error::Validation(format!(
            "unrecognised command {command:?}",
        )));
    }

    let name = rest.trim();
    let name = name.trim_matches('\'').trim_matches('"');
    let name = name.trim_start_matches('/');
    let name = name.strip_suffix(".git").unwrap_or(name);

    if name.is_empty() {
        return Err(Error::Validation("missing repository name".into()));
    }
    let valid = !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if !valid {
        return Err(Error::Validation(format!(
            "invalid repository name {name:?}",
        )));
    }

    Ok(GitRequest {
        service,
        repository: name.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// Decide whether `owner` may perform `request`.
///
/// Both records are fetched fresh from `store` on every call; a membership
/// or visibility change is honoured by the very next connection.  Unknown
/// users and repositories propagate as not-found, a known pair without the
/// required permission is an access-denied failure.
#[instrument(skip(store), fields(%owner, repository = %request.repository))]
pub fn authorize(
    store: &dyn RecordStore,
    owner: &str,
    request: &GitRequest,
) -> Result<RepositoryRecord> {
    let user = store.user(owner)?;
    let repository = store.repository(&request.repository)?;

    let level = request.service.required_access();
    if !perm::has_permission(&user, &repository, level) {
        warn!(?level, "access denied");
        return Err(Error::AccessDenied {
            user: owner.to_string(),
            repository: repository.name,
        });
    }

    debug!(?level, "access granted");
    Ok(repository)
}

// ---------------------------------------------------------------------------
// Service execution
// ---------------------------------------------------------------------------

/// On-disk location of a hosted bare repository.
pub fn repository_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{name}.git"))
}

/// Run the authorized git service against the bare repository, with stdio
/// inherited from the calling process so the pack protocol flows straight
/// between the SSH client and git.
#[instrument(fields(service = service.subcommand(), %name))]
pub async fn run_service(service: GitService, repo_root: &Path, name: &str) -> Result<ExitStatus> {
    let path = repository_path(repo_root, name);
    let status = Command::new("git")
        .arg(service.subcommand())
        .arg(&path)
        .status()
        .await
        .map_err(|err| Error::fs("spawn git service for", path.clone(), err))?;

    debug!(code = status.code(), "git service finished");
    Ok(status)
}

/// Full connection-time flow: parse, authorize, execute.
///
/// The process boundary maps the error cases to a non-zero exit and a
/// permission-denied message on stderr; nothing is served on any error.
pub async fn handle(
    store: &dyn RecordStore,
    config: &Config,
    owner: &str,
    original_command: &str,
) -> Result<ExitStatus> {
    let request = parse_original_command(original_command)?;
    authorize(store, owner, &request)?;
    run_service(request.service, &config.repository_root, &request.repository).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
