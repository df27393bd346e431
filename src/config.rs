use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Service configuration.
///
/// The hosting daemon loads this once at startup and hands it (or the values
/// derived from it) to the provisioning and access subsystems.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Absolute path of the access-control binary embedded in every
    /// restricted `authorized_keys` entry (the `command="..."` target).
    pub bin_path: String,

    /// Override for the managed `authorized_keys` file.
    ///
    /// Defaults to `~/.ssh/authorized_keys` of the user the service runs as.
    /// Tests point this at a scratch file.
    #[serde(default)]
    pub authorized_keys: Option<PathBuf>,

    /// Base directory holding the bare repositories (`<root>/<name>.git`).
    #[serde(default = "default_repository_root")]
    pub repository_root: PathBuf,
}

fn default_repository_root() -> PathBuf {
    PathBuf::from("/var/lib/gitwarden/repositories")
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

impl Config {
    /// Load and validate a [`Config`] from a YAML file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            Error::Config(format!("failed to read config file {}: {err}", path.display()))
        })?;
        let config: Config = serde_yaml::from_str(&contents).map_err(|err| {
            Error::Config(format!("failed to parse config file {}: {err}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity checks that cannot be expressed purely with serde.
    pub fn validate(&self) -> Result<()> {
        if self.bin_path.trim().is_empty() {
            return Err(Error::Config("bin_path must not be empty".into()));
        }
        if !Path::new(&self.bin_path).is_absolute() {
            return Err(Error::Config(format!(
                "bin_path must be absolute, got {:?}",
                self.bin_path,
            )));
        }
        Ok(())
    }

    /// Resolve the `authorized_keys` file this deployment manages.
    ///
    /// Uses the configured override when present, otherwise the SSH config
    /// directory under the current user's home.
    pub fn authorized_keys_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.authorized_keys {
            return Ok(path.clone());
        }
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?;
        Ok(home.join(".ssh").join("authorized_keys"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
