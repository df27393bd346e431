//! Pure permission evaluation.
//!
//! No I/O and no failure modes: given a user and a repository record, the
//! answer is a boolean.  Callers fetch the repository record fresh for every
//! evaluation so that membership and visibility changes take effect on the
//! next connection attempt.

use crate::records::{RepositoryRecord, UserRecord};

/// The access level a git operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Read,
    Write,
}

/// Whether `user` may push to `repo`: membership grants write.
pub fn has_write_permission(user: &UserRecord, repo: &RepositoryRecord) -> bool {
    repo.members.iter().any(|member| member == &user.identifier)
}

/// Whether `user` may fetch from `repo`: public repositories are readable
/// by everyone, private ones by members only.
pub fn has_read_permission(user: &UserRecord, repo: &RepositoryRecord) -> bool {
    repo.public || has_write_permission(user, repo)
}

/// Evaluate `level` against `repo` for `user`.
pub fn has_permission(user: &UserRecord, repo: &RepositoryRecord, level: AccessLevel) -> bool {
    match level {
        AccessLevel::Read => has_read_permission(user, repo),
        AccessLevel::Write => has_write_permission(user, repo),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn user(identifier: &str) -> UserRecord {
        UserRecord {
            identifier: identifier.to_string(),
            keys: Vec::new(),
        }
    }

    fn repo(members: &[&str], public: bool) -> RepositoryRecord {
        RepositoryRecord {
            name: "core".to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            public,
        }
    }

    #[test]
    fn member_has_write_and_read() {
        let repo = repo(&["alice"], false);
        assert!(has_write_permission(&user("alice"), &repo));
        assert!(has_read_permission(&user("alice"), &repo));
    }

    #[test]
    fn non_member_has_neither_on_private_repo() {
        let repo = repo(&["alice"], false);
        assert!(!has_write_permission(&user("bob"), &repo));
        assert!(!has_read_permission(&user("bob"), &repo));
    }

    #[test]
    fn public_flag_grants_read_but_not_write() {
        let mut repo = repo(&["alice"], false);
        assert!(!has_read_permission(&user("bob"), &repo));

        repo.public = true;
        assert!(has_read_permission(&user("bob"), &repo));
        assert!(!has_write_permission(&user("bob"), &repo));
    }

    #[test]
    fn public_read_is_independent_of_membership() {
        let repo = repo(&[], true);
        assert!(has_read_permission(&user("anyone"), &repo));
    }

    #[test]
    fn read_implies_write_or_public() {
        let users = ["alice", "bob"];
        let repos = [
            repo(&["alice"], false),
            repo(&["alice"], true),
            repo(&[], false),
            repo(&[], true),
        ];
        for u in users.map(user) {
            for r in &repos {
                if has_read_permission(&u, r) {
                    assert!(has_write_permission(&u, r) || r.public);
                }
            }
        }
    }

    #[test]
    fn access_level_dispatch() {
        let repo = repo(&["alice"], true);
        assert!(has_permission(&user("bob"), &repo, AccessLevel::Read));
        assert!(!has_permission(&user("bob"), &repo, AccessLevel::Write));
        assert!(has_permission(&user("alice"), &repo, AccessLevel::Write));
    }
}
