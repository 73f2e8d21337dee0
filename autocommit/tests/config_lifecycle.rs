//! Configuration persistence across backup, restore and reset.

use std::fs;

use autocommit::core::messages::{MessageError, default_messages};
use autocommit::io::config::{ConfigError, ConfigStore, Configuration};
use serde_json::json;

fn store() -> (tempfile::TempDir, ConfigStore) {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = ConfigStore::new(temp.path().join(".github_auto_commit"));
    (temp, store)
}

#[test]
fn backup_then_change_then_restore_returns_original() {
    let (_temp, store) = store();
    store.set_credentials("octo", "first-token").expect("setup");
    let original = store.load();

    let backup = store.backup().expect("backup");
    assert!(backup.starts_with(store.dir()));
    store.set("github_username", json!("someone-else")).expect("set");
    store.add_message("Extra message").expect("add");
    assert_ne!(store.load(), original);

    store.restore(&backup).expect("restore");
    assert_eq!(store.load(), original);
}

#[test]
fn reset_restores_defaults() {
    let (_temp, store) = store();
    store.set_credentials("octo", "token").expect("setup");
    store.remove_message(1).expect("remove");

    let cfg = store.reset().expect("reset");
    assert_eq!(cfg, Configuration::default());
    assert_eq!(store.load(), Configuration::default());
    assert_eq!(store.messages(), default_messages());
}

#[test]
fn restore_of_missing_backup_leaves_config_untouched() {
    let (temp, store) = store();
    store.set_credentials("octo", "token").expect("setup");
    let before = fs::read(store.path()).expect("read");

    let err = store
        .restore(&temp.path().join("nonexistent.json"))
        .expect_err("missing backup");
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::BackupNotFound(_))
    ));
    assert_eq!(fs::read(store.path()).expect("read"), before);
}

#[test]
fn last_message_cannot_be_removed() {
    let (_temp, store) = store();
    store
        .set("commit_messages", json!(["only one"]))
        .expect("set");

    let err = store.remove_message(1).expect_err("last message");
    assert!(matches!(
        err.downcast_ref::<MessageError>(),
        Some(MessageError::LastMessage)
    ));
    assert_eq!(store.messages(), vec!["only one".to_string()]);
}

#[test]
fn out_of_range_edit_is_rejected() {
    let (_temp, store) = store();
    let len = store.messages().len();
    let err = store
        .edit_message(len + 1, "nope")
        .expect_err("out of range");
    assert!(matches!(
        err.downcast_ref::<MessageError>(),
        Some(MessageError::OutOfRange { .. })
    ));
}

#[test]
fn external_edits_are_seen_on_next_read() {
    let (_temp, store) = store();
    store.load();
    fs::write(
        store.path(),
        r#"{"github_username":"edited-by-hand","commit_messages":["a","b"]}"#,
    )
    .expect("write");

    assert_eq!(store.get("github_username"), Some(json!("edited-by-hand")));
    assert_eq!(store.messages(), vec!["a".to_string(), "b".to_string()]);
}
