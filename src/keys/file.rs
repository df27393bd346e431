//! Typed model of the `authorized_keys` file contents.
//!
//! The file is shared with sshd and with whatever an operator has placed in
//! it by hand.  Lines are therefore classified on load: entries produced by
//! this crate are structured, everything else is foreign content that must
//! survive every mutation byte-for-byte and in its original order.

use super::entry;

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// One line of the key file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Content this crate does not own: comments, unrelated keys, blanks.
    Foreign(String),
    /// A restricted entry written by this crate.
    Managed {
        raw: String,
        owner: String,
        key: String,
    },
}

impl Line {
    fn classify(raw: String) -> Line {
        match entry::parse_entry(&raw) {
            Some(parsed) => {
                let owner = parsed.owner.to_string();
                let key = parsed.key.to_string();
                Line::Managed { raw, owner, key }
            }
            None => Line::Foreign(raw),
        }
    }

    /// The exact bytes this line serializes back to.
    pub fn raw(&self) -> &str {
        match self {
            Line::Foreign(raw) => raw,
            Line::Managed { raw, .. } => raw,
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// In-memory form of the whole key file.
///
/// `serialize(parse(content)) == content` for any input: the document keeps
/// track of whether the source ended with a newline so the final line's
/// "no trailing newline" case needs no special handling during removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFileContents {
    lines: Vec<Line>,
    trailing_newline: bool,
}

impl Default for KeyFileContents {
    /// An empty document.  Files created from it end with a newline.
    fn default() -> Self {
        KeyFileContents {
            lines: Vec::new(),
            trailing_newline: true,
        }
    }
}

impl KeyFileContents {
    pub fn parse(content: &str) -> Self {
        if content.is_empty() {
            return KeyFileContents::default();
        }
        let trailing_newline = content.ends_with('\n');
        let body = if trailing_newline {
            &content[..content.len() - 1]
        } else {
            content
        };
        let lines = body
            .split('\n')
            .map(|raw| Line::classify(raw.to_string()))
            .collect();
        KeyFileContents {
            lines,
            trailing_newline,
        }
    }

    pub fn serialize(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut out = self
            .lines
            .iter()
            .map(Line::raw)
            .collect::<Vec<_>>()
            .join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether any line byte-equals `formatted`.
    pub fn contains_line(&self, formatted: &str) -> bool {
        self.lines.iter().any(|line| line.raw() == formatted)
    }

    /// Append a formatted entry as a new final line.
    ///
    /// Returns `false` without modifying the document when a byte-identical
    /// line is already present: duplicate restricted entries grant nothing
    /// and make removal ambiguous.
    pub fn push_entry(&mut self, formatted: String) -> bool {
        if self.contains_line(&formatted) {
            return false;
        }
        self.lines.push(Line::classify(formatted));
        true
    }

    /// Drop every line whose bytes equal `formatted`, foreign or managed.
    ///
    /// Returns the number of lines removed.  Removal is by exact match of
    /// the formatted text, so an operator-pasted copy of a managed entry is
    /// revoked together with the managed one.
    pub fn remove_matching(&mut self, formatted: &str) -> usize {
        let before = self.lines.len();
        self.lines.retain(|line| line.raw() != formatted);
        before - self.lines.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
