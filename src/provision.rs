//! Key provisioning.
//!
//! [`Provisioner`] exposes the two mutating entry points the control plane
//! calls on key registration and revocation, plus their batch forms for user
//! creation and deletion.  These are the only writers of the key file.
//!
//! Repository membership never touches the key file: one entry authorizes
//! its owner for every repository they are a member of, and per-repository
//! enforcement happens at connection time in [`crate::access`].

use tracing::{info, instrument};

use crate::config::Config;
use crate::error::Result;
use crate::keys::{KeyStore, PublicKey};
use crate::records::validate_identifier;

/// Control-plane facade over the authorized-keys store.
#[derive(Debug, Clone)]
pub struct Provisioner {
    store: KeyStore,
}

impl Provisioner {
    pub fn new(store: KeyStore) -> Self {
        Provisioner { store }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Provisioner::new(KeyStore::from_config(config)?))
    }

    pub fn store(&self) -> &KeyStore {
        &self.store
    }

    /// Grant SSH access for a newly registered key.
    #[instrument(skip(self, key), fields(%owner))]
    pub async fn add_user_key(&self, owner: &str, key: &PublicKey) -> Result<()> {
        validate_identifier(owner)?;
        self.store.add_entry(key.as_str(), owner).await?;
        info!("registered key");
        Ok(())
    }

    /// Grant SSH access for several keys at once (user creation).
    ///
    /// Fail-fast: keys registered before an error stay registered.
    #[instrument(skip(self, keys), fields(%owner, count = keys.len()))]
    pub async fn add_user_keys(&self, owner: &str, keys: &[PublicKey]) -> Result<()> {
        validate_identifier(owner)?;
        for key in keys {
            self.store.add_entry(key.as_str(), owner).await?;
        }
        info!("registered keys");
        Ok(())
    }

    /// Revoke SSH access for one key (key deletion).
    #[instrument(skip(self, key), fields(%owner))]
    pub async fn remove_user_key(&self, owner: &str, key: &PublicKey) -> Result<()> {
        validate_identifier(owner)?;
        self.store.remove_entry(key.as_str(), owner).await?;
        info!("revoked key");
        Ok(())
    }

    /// Revoke SSH access for several keys at once (user deletion).
    ///
    /// Same fail-fast, non-transactional semantics as
    /// [`add_user_keys`](Self::add_user_keys).
    #[instrument(skip(self, keys), fields(%owner, count = keys.len()))]
    pub async fn remove_user_keys(&self, owner: &str, keys: &[PublicKey]) -> Result<()> {
        validate_identifier(owner)?;
        for key in keys {
            self.store.remove_entry(key.as_str(), owner).await?;
        }
        info!("revoked keys");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
