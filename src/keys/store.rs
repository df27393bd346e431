//! The authorized-keys store.
//!
//! Owns exactly one key file and performs every mutation as a whole-file
//! read-modify-write.  The file is read synchronously by sshd on every
//! connection attempt, so a mutation must never leave it half-written and
//! must never disturb content it does not own.
//!
//! Concurrent provisioning requests against the same path are serialized
//! through a process-wide per-path mutex: an unsynchronized read-modify-write
//! pair would silently drop one of the two grants.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, OnceLock};

use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::keys::entry;
use crate::keys::file::KeyFileContents;

// ---------------------------------------------------------------------------
// Per-path serialization
// ---------------------------------------------------------------------------

/// Fetch (or create) the mutex guarding `path`.
///
/// Two [`KeyStore`] instances pointing at the same path share one mutex, so
/// serialization holds per file, not per store handle.  Locks are never
/// dropped from the registry; a host manages a handful of key files at most.
fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<StdMutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let registry = LOCKS.get_or_init(|| StdMutex::new(HashMap::new()));
    let mut map = registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    map.entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Handle on the single shared `authorized_keys` file.
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
    bin_path: String,
}

impl KeyStore {
    /// Build a store for `path`, formatting entries against `bin_path`.
    pub fn new(path: impl Into<PathBuf>, bin_path: impl Into<String>) -> Result<Self> {
        let bin_path = bin_path.into();
        if bin_path.trim().is_empty() {
            return Err(Error::Config(
                "access-command path (bin_path) is not configured".into(),
            ));
        }
        Ok(KeyStore {
            path: path.into(),
            bin_path,
        })
    }

    /// Build a store from the service configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let path = config.authorized_keys_path()?;
        KeyStore::new(path, config.bin_path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The restricted line that `(key, owner)` maps to in this store.
    pub fn formatted_entry(&self, key: &str, owner: &str) -> String {
        entry::format_entry(&self.bin_path, owner, key)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Append the restricted entry for `(key, owner)` after the file's
    /// existing content, creating the file if absent.
    ///
    /// Existing bytes are never altered.  Adding an entry that is already
    /// present is a no-op.
    #[instrument(skip(self, key), fields(path = %self.path.display(), %owner))]
    pub async fn add_entry(&self, key: &str, owner: &str) -> Result<()> {
        let formatted = self.formatted_entry(key, owner);
        let lock = path_lock(&self.path);
        let _guard = lock.lock().await;

        let mut contents = self.load().await?;
        if !contents.push_entry(formatted) {
            debug!("entry already present; nothing to do");
            return Ok(());
        }
        self.write(&contents).await?;
        debug!("entry appended");
        Ok(())
    }

    /// [`add_entry`](Self::add_entry) for each key, in the supplied order.
    ///
    /// Fails fast: on the first error the remaining keys are not attempted
    /// and entries already written stay written.
    pub async fn add_entries<S: AsRef<str>>(&self, keys: &[S], owner: &str) -> Result<()> {
        for key in keys {
            self.add_entry(key.as_ref(), owner).await?;
        }
        Ok(())
    }

    /// Delete every line that byte-equals the restricted entry for
    /// `(key, owner)` and rewrite the file with the remaining content.
    ///
    /// Absence of a match, or of the file itself, is a no-op rather than an
    /// error, which makes revocation idempotent.
    #[instrument(skip(self, key), fields(path = %self.path.display(), %owner))]
    pub async fn remove_entry(&self, key: &str, owner: &str) -> Result<()> {
        let formatted = self.formatted_entry(key, owner);
        let lock = path_lock(&self.path);
        let _guard = lock.lock().await;

        let mut contents = self.load().await?;
        let removed = contents.remove_matching(&formatted);
        if removed == 0 {
            debug!("no matching entry; nothing to do");
            return Ok(());
        }
        self.write(&contents).await?;
        debug!(removed, "entry removed");
        Ok(())
    }

    /// [`remove_entry`](Self::remove_entry) for each key, in the supplied
    /// order, with the same fail-fast, non-transactional semantics as
    /// [`add_entries`](Self::add_entries).
    pub async fn remove_entries<S: AsRef<str>>(&self, keys: &[S], owner: &str) -> Result<()> {
        for key in keys {
            self.remove_entry(key.as_ref(), owner).await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // File I/O
    // -----------------------------------------------------------------------

    /// Read and parse the whole file.  A missing file is an empty document.
    ///
    /// Callers must hold the path lock.
    async fn load(&self) -> Result<KeyFileContents> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(KeyFileContents::parse(&content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Ok(KeyFileContents::default())
            }
            Err(err) => Err(Error::fs("read", &self.path, err)),
        }
    }

    /// Truncate and rewrite the file with the serialized document.
    ///
    /// Callers must hold the path lock.
    async fn write(&self, contents: &KeyFileContents) -> Result<()> {
        tokio::fs::write(&self.path, contents.serialize())
            .await
            .map_err(|err| Error::fs("write", &self.path, err))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
