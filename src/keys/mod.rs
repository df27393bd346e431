//! The authorized-keys subsystem.
//!
//! Three layers, leaf first: [`entry`] renders and recognises the restricted
//! entry format, [`file`] models the shared file as typed lines with
//! byte-exact serialization, and [`store`] owns the file on disk and
//! serializes every mutation to it.

pub mod entry;
pub mod file;
pub mod store;

pub use entry::{format_entry, parse_entry, ManagedEntry, PublicKey, ENTRY_OPTIONS};
pub use file::{KeyFileContents, Line};
pub use store::KeyStore;
