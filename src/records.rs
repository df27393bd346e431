//! User and repository records, and the seam to the external record store.
//!
//! Persistence of these records belongs to the hosting control plane; this
//! crate only defines the shapes it needs to make access decisions and the
//! [`RecordStore`] trait it reads them through.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::keys::PublicKey;

// ---------------------------------------------------------------------------
// Identifier grammar
// ---------------------------------------------------------------------------

/// Enforce the user identifier grammar: non-empty, ASCII alphanumerics,
/// `.`, and `@` only.
///
/// This is the single guard that makes it safe to embed identifiers into
/// `command="..."` strings without escaping (see
/// [`crate::keys::format_entry`]); loosening it requires revisiting the
/// formatter.
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() {
        return Err(Error::Validation("user identifier is empty".into()));
    }
    let valid = identifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '@');
    if !valid {
        return Err(Error::Validation(format!(
            "user identifier {identifier:?} contains characters outside [A-Za-z0-9.@]",
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A hosted user: an identifier plus the public keys registered to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub identifier: String,
    pub keys: Vec<PublicKey>,
}

/// A hosted repository.
///
/// `members` is the ordered set of identifiers granted write access;
/// `public` opens read access to everyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRecord {
    pub name: String,
    pub members: Vec<String>,
    pub public: bool,
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Keyed lookups against the control plane's record store.
///
/// Implementations must return current data on every call: access decisions
/// are evaluated against a fresh [`RepositoryRecord`] each time, so a
/// membership or visibility change is visible to the very next connection
/// attempt.  No caching layer sits between this trait and its callers.
pub trait RecordStore: Send + Sync {
    fn user(&self, identifier: &str) -> Result<UserRecord>;
    fn repository(&self, name: &str) -> Result<RepositoryRecord>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryInner {
    users: HashMap<String, UserRecord>,
    repositories: HashMap<String, RepositoryRecord>,
}

/// In-process [`RecordStore`] used by tests and by embedding hosts that keep
/// their records elsewhere and mirror them here.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn insert_user(&self, user: UserRecord) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        inner.users.insert(user.identifier.clone(), user);
    }

    pub fn insert_repository(&self, repository: RepositoryRecord) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        inner.repositories.insert(repository.name.clone(), repository);
    }
}

impl RecordStore for MemoryStore {
    fn user(&self, identifier: &str) -> Result<UserRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .users
            .get(identifier)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                kind: "user",
                name: identifier.to_string(),
            })
    }

    fn repository(&self, name: &str) -> Result<RepositoryRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .repositories
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                kind: "repository",
                name: name.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_accepts_grammar() {
        for id in ["alice", "sam.gamgee", "bob@example.com", "U2", "a"] {
            assert!(validate_identifier(id).is_ok(), "{id}");
        }
    }

    #[test]
    fn identifier_rejects_outside_grammar() {
        for id in ["", "with space", "semi;colon", "quote\"", "dollar$", "dash-er", "tab\t"] {
            assert!(validate_identifier(id).is_err(), "{id:?}");
        }
    }

    #[test]
    fn memory_store_lookup_and_not_found() {
        let store = MemoryStore::new();
        store.insert_user(UserRecord {
            identifier: "alice".into(),
            keys: Vec::new(),
        });
        store.insert_repository(RepositoryRecord {
            name: "core".into(),
            members: vec!["alice".into()],
            public: false,
        });

        assert_eq!(store.user("alice").unwrap().identifier, "alice");
        assert_eq!(store.repository("core").unwrap().members, vec!["alice"]);
        assert!(matches!(
            store.user("ghost"),
            Err(Error::NotFound { kind: "user", .. }),
        ));
        assert!(matches!(
            store.repository("ghost"),
            Err(Error::NotFound { kind: "repository", .. }),
        ));
    }
}
