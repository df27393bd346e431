//! End-to-end flow: provision keys into a scratch authorized_keys file,
//! then drive connection-time authorization against an in-memory record
//! store, the way the hosting daemon and the access-control binary do.

use gitwarden::access::{self, GitService};
use gitwarden::{
    Config, Error, KeyStore, MemoryStore, Provisioner, PublicKey, RepositoryRecord, UserRecord,
};

const BIN: &str = "/usr/local/bin/gitwarden-shell";

fn provisioner_in(dir: &tempfile::TempDir) -> Provisioner {
    let store = KeyStore::new(dir.path().join("authorized_keys"), BIN).unwrap();
    Provisioner::new(store)
}

async fn key_file(provisioner: &Provisioner) -> String {
    tokio::fs::read_to_string(provisioner.store().path())
        .await
        .unwrap()
}

#[tokio::test]
async fn registration_appends_exactly_one_restricted_line() {
    let dir = tempfile::tempdir().unwrap();
    let provisioner = provisioner_in(&dir);
    let key = PublicKey::new("ssh-rsa AAAAB3NzaC1yc2E glum@host").unwrap();

    provisioner.add_user_key("glum", &key).await.unwrap();

    assert_eq!(
        key_file(&provisioner).await,
        "no-port-forwarding,no-X11-forwarding,no-agent-forwarding,no-pty,\
         command=\"/usr/local/bin/gitwarden-shell glum\" \
         ssh-rsa AAAAB3NzaC1yc2E glum@host\n",
    );
}

#[tokio::test]
async fn revocation_restores_prior_file_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let provisioner = provisioner_in(&dir);
    let prior = "# managed by ops\nssh-ed25519 AAAAC3NzaC1lZDI1 backup@host";
    tokio::fs::write(provisioner.store().path(), prior)
        .await
        .unwrap();
    let key = PublicKey::new("ssh-rsa AAAA alice@laptop").unwrap();

    provisioner.add_user_key("alice", &key).await.unwrap();
    assert_ne!(key_file(&provisioner).await, prior);

    provisioner.remove_user_key("alice", &key).await.unwrap();
    assert_eq!(key_file(&provisioner).await, prior);
}

#[tokio::test]
async fn user_lifecycle_with_several_keys() {
    let dir = tempfile::tempdir().unwrap();
    let provisioner = provisioner_in(&dir);
    let keys: Vec<PublicKey> = (0..4)
        .map(|i| PublicKey::new(format!("ssh-rsa KEY{i} dev{i}@host")).unwrap())
        .collect();

    provisioner.add_user_keys("sam.gamgee", &keys).await.unwrap();

    let content = key_file(&provisioner).await;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    for (line, key) in lines.iter().zip(keys.iter()) {
        assert_eq!(
            *line,
            provisioner
                .store()
                .formatted_entry(key.as_str(), "sam.gamgee"),
        );
    }

    // Removing one key leaves the others untouched and in order.
    provisioner
        .remove_user_key("sam.gamgee", &keys[2])
        .await
        .unwrap();
    let content = key_file(&provisioner).await;
    assert_eq!(content.lines().count(), 3);
    assert!(!content.contains("KEY2"));

    provisioner
        .remove_user_keys("sam.gamgee", &keys)
        .await
        .unwrap();
    assert_eq!(key_file(&provisioner).await, "");
}

#[tokio::test]
async fn provisioned_owner_is_enforced_at_connection_time() {
    let dir = tempfile::tempdir().unwrap();
    let provisioner = provisioner_in(&dir);
    let key = PublicKey::new("ssh-rsa AAAA alice@laptop").unwrap();
    provisioner.add_user_key("alice", &key).await.unwrap();

    let records = MemoryStore::new();
    records.insert_user(UserRecord {
        identifier: "alice".into(),
        keys: vec![key],
    });
    records.insert_user(UserRecord {
        identifier: "bob".into(),
        keys: Vec::new(),
    });
    records.insert_repository(RepositoryRecord {
        name: "core".into(),
        members: vec!["alice".into()],
        public: false,
    });

    // The member can fetch and push.
    for cmd in ["git-upload-pack 'core.git'", "git-receive-pack 'core.git'"] {
        let request = access::parse_original_command(cmd).unwrap();
        assert!(access::authorize(&records, "alice", &request).is_ok());
    }

    // A non-member is denied outright on a private repository.
    let fetch = access::parse_original_command("git-upload-pack 'core.git'").unwrap();
    assert!(matches!(
        access::authorize(&records, "bob", &fetch),
        Err(Error::AccessDenied { .. }),
    ));

    // Making the repository public opens reads, not writes.
    records.insert_repository(RepositoryRecord {
        name: "core".into(),
        members: vec!["alice".into()],
        public: true,
    });
    assert!(access::authorize(&records, "bob", &fetch).is_ok());
    let push = access::parse_original_command("git-receive-pack 'core.git'").unwrap();
    assert!(matches!(
        access::authorize(&records, "bob", &push),
        Err(Error::AccessDenied { .. }),
    ));
    assert_eq!(
        fetch.service,
        GitService::UploadPack,
        "fetch request parses to upload-pack",
    );
}

#[tokio::test]
async fn config_wires_the_store_path() {
    let dir = tempfile::tempdir().unwrap();
    let keys_path = dir.path().join("authorized_keys");
    let config_path = dir.path().join("config.yaml");
    tokio::fs::write(
        &config_path,
        format!(
            "bin_path: {BIN}\nauthorized_keys: {}\nrepository_root: /srv/git\n",
            keys_path.display(),
        ),
    )
    .await
    .unwrap();

    let config = Config::load(&config_path).unwrap();
    let provisioner = Provisioner::from_config(&config).unwrap();
    assert_eq!(provisioner.store().path(), keys_path);

    let key = PublicKey::new("ssh-rsa AAAA carol@host").unwrap();
    provisioner.add_user_key("carol", &key).await.unwrap();
    assert!(keys_path.exists());
}
