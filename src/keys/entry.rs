//! Restricted `authorized_keys` entry formatting.
//!
//! A registered public key never grants a shell.  Each key is written to the
//! key file wrapped in options that disable forwarding and PTY allocation and
//! force every session authenticated with it to run the configured
//! access-control command, which receives the key owner's identifier as an
//! argument.

use crate::error::{Error, Result};

/// Options prefix applied to every managed entry.
pub const ENTRY_OPTIONS: &str =
    "no-port-forwarding,no-X11-forwarding,no-agent-forwarding,no-pty";

// ---------------------------------------------------------------------------
// Public key
// ---------------------------------------------------------------------------

/// Opaque SSH public key text.
///
/// Key material is supplied by an already-authenticated caller and is not
/// cryptographically validated here.  The only structural requirement is
/// that the text fits on a single `authorized_keys` line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKey(String);

impl PublicKey {
    /// Accept raw key text, rejecting anything that cannot occupy exactly
    /// one line of the key file.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::Validation("public key text is empty".into()));
        }
        if text.contains('\n') || text.contains('\r') {
            return Err(Error::Validation(
                "public key text must not contain line breaks".into(),
            ));
        }
        Ok(PublicKey(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Render the restricted entry for `key` owned by `owner`.
///
/// Pure and deterministic: identical inputs always produce byte-identical
/// output, which is what makes entries removable by exact match later.
///
/// The owner identifier is embedded into the `command="..."` string without
/// any escaping.  That is safe only because identifiers are restricted to
/// ASCII alphanumerics, `.`, and `@` before they reach this function; see
/// [`crate::records::validate_identifier`].
pub fn format_entry(bin_path: &str, owner: &str, key: &str) -> String {
    format!("{ENTRY_OPTIONS},command=\"{bin_path} {owner}\" {key}")
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Structural view of a managed entry line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagedEntry<'a> {
    pub bin_path: &'a str,
    pub owner: &'a str,
    pub key: &'a str,
}

/// Parse one key-file line as a managed entry.
///
/// Inverse of [`format_entry`].  Any line that does not match the exact
/// shape produced by this crate is foreign content and must be preserved
/// untouched, so parsing is deliberately conservative: on any mismatch the
/// answer is `None`, never a guess.
pub fn parse_entry(line: &str) -> Option<ManagedEntry<'_>> {
    let rest = line.strip_prefix(ENTRY_OPTIONS)?;
    let rest = rest.strip_prefix(",command=\"")?;
    let close = rest.find('"')?;
    let command = &rest[..close];
    let key = rest[close + 1..].strip_prefix(' ')?;
    // The command string is `<bin_path> <owner>`; the owner grammar has no
    // spaces, so the final space splits the two.
    let (bin_path, owner) = command.rsplit_once(' ')?;
    if bin_path.is_empty() || owner.is_empty() || key.is_empty() {
        return None;
    }
    Some(ManagedEntry {
        bin_path,
        owner,
        key,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BIN: &str = "/usr/local/bin/gitwarden-shell";

    #[test]
    fn format_entry_exact_output() {
        let line = format_entry(BIN, "frodo", "ssh-rsa AAAAB3Nza frodo@shire");
        assert_eq!(
            line,
            "no-port-forwarding,no-X11-forwarding,no-agent-forwarding,no-pty,\
             command=\"/usr/local/bin/gitwarden-shell frodo\" \
             ssh-rsa AAAAB3Nza frodo@shire",
        );
    }

    #[test]
    fn format_entry_is_deterministic() {
        let a = format_entry(BIN, "alice", "ssh-ed25519 AAAAC3 alice@host");
        let b = format_entry(BIN, "alice", "ssh-ed25519 AAAAC3 alice@host");
        assert_eq!(a, b);
    }

    #[test]
    fn parse_entry_inverts_format_entry() {
        let line = format_entry(BIN, "sam.gamgee@shire", "ssh-rsa AAAA sam@host");
        let entry = parse_entry(&line).unwrap();
        assert_eq!(entry.bin_path, BIN);
        assert_eq!(entry.owner, "sam.gamgee@shire");
        assert_eq!(entry.key, "ssh-rsa AAAA sam@host");
    }

    #[test]
    fn parse_entry_rejects_foreign_lines() {
        assert!(parse_entry("# comment").is_none());
        assert!(parse_entry("ssh-rsa AAAA plain@host").is_none());
        assert!(parse_entry("").is_none());
        assert!(parse_entry("no-port-forwarding,command=\"/bin/x y\" key").is_none());
    }

    #[test]
    fn parse_entry_rejects_truncated_entry() {
        let line = format_entry(BIN, "alice", "ssh-rsa AAAA");
        let truncated = &line[..line.len() - 13];
        assert!(parse_entry(truncated).is_none());
    }

    #[test]
    fn public_key_rejects_newlines() {
        assert!(PublicKey::new("ssh-rsa AAAA\nssh-rsa BBBB").is_err());
        assert!(PublicKey::new("ssh-rsa AAAA\r").is_err());
    }

    #[test]
    fn public_key_rejects_empty() {
        assert!(PublicKey::new("").is_err());
        assert!(PublicKey::new("   ").is_err());
    }

    #[test]
    fn public_key_accepts_opaque_text() {
        let key = PublicKey::new("ssh-rsa AAAAB3Nza... user@host").unwrap();
        assert_eq!(key.as_str(), "ssh-rsa AAAAB3Nza... user@host");
    }
}
