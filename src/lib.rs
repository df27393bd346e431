//! SSH access control for bare Git repository hosting.
//!
//! A control plane grants and revokes push/pull access to hosted bare
//! repositories without ever handing out a real shell.  Two mechanisms
//! cooperate:
//!
//! * **Provisioning** ([`provision`]): every registered public key becomes a
//!   restricted `authorized_keys` entry ([`keys`]) that forces sessions
//!   authenticated with it to run the hosting service's access-control
//!   command.  The shared key file is mutated under a per-path lock and
//!   operator-owned content in it is preserved byte-for-byte.
//! * **Enforcement** ([`access`]): at connection time the access-control
//!   command parses the client's git request, evaluates the pure permission
//!   rules ([`perm`]) against fresh records ([`records`]), and either execs
//!   the git service or fails closed.
//!
//! Record persistence, repository creation, and process bootstrap live with
//! the embedding host; this crate takes them as injected collaborators.

pub mod access;
pub mod config;
pub mod error;
pub mod keys;
pub mod perm;
pub mod provision;
pub mod records;

pub use config::Config;
pub use error::{Error, Result};
pub use keys::{KeyStore, PublicKey};
pub use provision::Provisioner;
pub use records::{MemoryStore, RecordStore, RepositoryRecord, UserRecord};
