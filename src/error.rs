//! Error taxonomy.
//!
//! Every failure in this crate surfaces as one of the variants below and
//! propagates to the immediate caller unmodified; nothing here retries.
//! Batch operations fail fast and report only the failing item; entries
//! committed before the failure stay committed.

use std::io;
use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or unusable configuration, e.g. an empty access-command path.
    #[error("configuration error: {0}")]
    Config(String),

    /// A filesystem operation failed. Never auto-retried.
    #[error("failed to {op} {}: {source}", path.display())]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Input rejected before any mutation: a malformed identifier, key text,
    /// or client command line.
    #[error("validation error: {0}")]
    Validation(String),

    /// A record lookup came back empty.
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// The requested git operation is not permitted for this user.
    #[error("user {user} does not have access to repository {repository}")]
    AccessDenied { user: String, repository: String },
}

impl Error {
    pub(crate) fn fs(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Filesystem {
            op,
            path: path.into(),
            source,
        }
    }
}
