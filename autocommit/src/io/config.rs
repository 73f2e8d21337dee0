//! Persisted configuration stored under `~/.github_auto_commit/config.json`.
//!
//! Every operation reloads the file first so edits made by other processes
//! (a hand edit, a restore from another shell) are never overwritten with
//! stale in-memory state.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::messages::{self, MessageError, default_messages};
use crate::core::schedule::{CommitPattern, ScheduleError, ScheduleWindow};

/// Overrides the config directory (used by tests and sandboxed setups).
pub const CONFIG_DIR_ENV: &str = "AUTOCOMMIT_CONFIG_DIR";
const CONFIG_DIR_NAME: &str = ".github_auto_commit";
const CONFIG_FILE_NAME: &str = "config.json";
const BACKUP_PREFIX: &str = "config_backup_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("backup file not found: {}", .0.display())]
    BackupNotFound(PathBuf),
    #[error("backup file {} is not a valid configuration: {reason}", path.display())]
    InvalidBackup { path: PathBuf, reason: String },
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("cannot locate home directory (set AUTOCOMMIT_CONFIG_DIR)")]
    NoHomeDir,
}

/// Settings persisted between runs.
///
/// Keys this struct does not know about are kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Configuration {
    pub github_username: String,
    pub github_token: String,
    /// Pool for random commit messages. Never empty after load.
    pub commit_messages: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub commit_patterns: BTreeMap<String, CommitPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleWindow>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            github_username: String::new(),
            github_token: String::new(),
            commit_messages: default_messages(),
            commit_patterns: BTreeMap::new(),
            schedule: None,
            extra: Map::new(),
        }
    }
}

/// GitHub username and personal access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl Configuration {
    /// Username and token, if both are set.
    pub fn credentials(&self) -> Option<Credentials> {
        let username = self.github_username.trim();
        let token = self.github_token.trim();
        if username.is_empty() || token.is_empty() {
            return None;
        }
        Some(Credentials {
            username: username.to_string(),
            token: token.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        for (name, pattern) in &self.commit_patterns {
            pattern.validate(name)?;
        }
        if let Some(window) = &self.schedule {
            window.validate()?;
        }
        Ok(())
    }

    /// Restore the built-in messages when the pool is empty. Returns true if changed.
    fn normalize(&mut self) -> bool {
        if self.commit_messages.is_empty() {
            self.commit_messages = default_messages();
            return true;
        }
        false
    }
}

/// JSON-backed configuration store rooted at a directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store at `$AUTOCOMMIT_CONFIG_DIR`, else `~/.github_auto_commit`.
    pub fn from_env() -> Result<Self> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|dir| !dir.is_empty()) {
            return Ok(Self::new(dir));
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::new(home.join(CONFIG_DIR_NAME)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    /// Load the configuration, never failing.
    ///
    /// A missing file is created with defaults. An unreadable or malformed file
    /// is moved aside to `config.json.corrupt`, reported as a warning and
    /// replaced with defaults.
    pub fn load(&self) -> Configuration {
        let path = self.path();
        match read_config(&path) {
            Ok(Some(mut cfg)) => {
                if cfg.normalize() {
                    debug!(path = %path.display(), "empty message pool replaced with defaults");
                }
                cfg
            }
            Ok(None) => {
                debug!(path = %path.display(), "config missing, writing defaults");
                let cfg = Configuration::default();
                self.persist_or_warn(&cfg);
                cfg
            }
            Err(err) => {
                warn!(path = %path.display(), err = %format!("{err:#}"), "error loading config, falling back to defaults");
                let aside = path.with_extension("json.corrupt");
                if let Err(err) = fs::rename(&path, &aside) {
                    warn!(err = %err, "could not move unreadable config aside");
                }
                let cfg = Configuration::default();
                self.persist_or_warn(&cfg);
                cfg
            }
        }
    }

    pub fn save(&self, cfg: &Configuration) -> Result<()> {
        write_json_atomic(&self.path(), cfg)
    }

    fn persist_or_warn(&self, cfg: &Configuration) {
        if let Err(err) = self.save(cfg) {
            warn!(err = %format!("{err:#}"), "could not persist default config");
        }
    }

    /// Raw JSON value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(self.load()) {
            Ok(Value::Object(map)) => map.get(key).cloned(),
            _ => None,
        }
    }

    /// Set `key` to `value` and persist immediately.
    ///
    /// Values for known keys must have the right shape; `commit_messages` may
    /// not be set to an empty list.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            key: key.to_string(),
            reason,
        };
        let mut map = match serde_json::to_value(self.load()).context("serialize config")? {
            Value::Object(map) => map,
            other => return Err(anyhow!("config serialized to non-object {other}")),
        };
        map.insert(key.to_string(), value);
        let updated: Configuration =
            serde_json::from_value(Value::Object(map)).map_err(|err| invalid(err.to_string()))?;
        if updated.commit_messages.is_empty() {
            return Err(invalid("commit_messages must not be empty".to_string()).into());
        }
        updated
            .validate()
            .map_err(|err| invalid(err.to_string()))?;
        self.save(&updated)?;
        debug!(key, "config value updated");
        Ok(())
    }

    pub fn set_credentials(&self, username: &str, token: &str) -> Result<()> {
        let (username, token) = (username.trim(), token.trim());
        if username.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "github_username".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if token.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "github_token".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        let mut cfg = self.load();
        cfg.github_username = username.to_string();
        cfg.github_token = token.to_string();
        self.save(&cfg)
    }

    /// Snapshot the current configuration next to the live file.
    pub fn backup(&self) -> Result<PathBuf> {
        self.backup_at(Local::now().naive_local())
    }

    /// Like [`ConfigStore::backup`] with an explicit timestamp for the file name.
    ///
    /// A numeric suffix keeps backups taken within the same second apart.
    pub fn backup_at(&self, at: NaiveDateTime) -> Result<PathBuf> {
        let cfg = self.load();
        let stamp = at.format("%Y%m%d_%H%M%S").to_string();
        let mut path = self.dir.join(format!("{BACKUP_PREFIX}{stamp}.json"));
        let mut suffix = 2u32;
        while path.exists() {
            path = self
                .dir
                .join(format!("{BACKUP_PREFIX}{stamp}_{suffix}.json"));
            suffix += 1;
        }
        write_json_atomic(&path, &cfg)?;
        info!(path = %path.display(), "configuration backed up");
        Ok(path)
    }

    /// Replace the live configuration with the contents of `backup`.
    ///
    /// The live file is untouched unless the backup exists and parses.
    pub fn restore(&self, backup: &Path) -> Result<()> {
        if !backup.exists() {
            return Err(ConfigError::BackupNotFound(backup.to_path_buf()).into());
        }
        let contents = fs::read_to_string(backup)
            .with_context(|| format!("read backup {}", backup.display()))?;
        let mut cfg: Configuration =
            serde_json::from_str(&contents).map_err(|err| ConfigError::InvalidBackup {
                path: backup.to_path_buf(),
                reason: err.to_string(),
            })?;
        cfg.normalize();
        self.save(&cfg)?;
        info!(from = %backup.display(), "configuration restored");
        Ok(())
    }

    /// Delete the live file and recreate it with defaults.
    pub fn reset(&self) -> Result<Configuration> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        }
        let cfg = Configuration::default();
        self.save(&cfg)?;
        info!(path = %path.display(), "configuration reset to defaults");
        Ok(cfg)
    }

    /// Backup files in the config directory, newest first.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let pattern = Regex::new(r"^config_backup_(\d{8}_\d{6})(?:_(\d+))?\.json$")
            .context("compile backup name pattern")?;
        let mut found: Vec<(String, u32, PathBuf)> = Vec::new();
        for entry in
            fs::read_dir(&self.dir).with_context(|| format!("read {}", self.dir.display()))?
        {
            let entry = entry.context("read entry")?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(caps) = pattern.captures(&name) else {
                continue;
            };
            let suffix = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(1);
            found.push((caps[1].to_string(), suffix, entry.path()));
        }
        found.sort_by(|a, b| (&b.0, b.1).cmp(&(&a.0, a.1)));
        Ok(found.into_iter().map(|(_, _, path)| path).collect())
    }

    pub fn messages(&self) -> Vec<String> {
        self.load().commit_messages
    }

    /// Replace the whole pool. Blank entries are dropped; an empty result is rejected.
    pub fn set_messages(&self, pool: &[String]) -> Result<()> {
        let pool: Vec<String> = pool
            .iter()
            .map(|message| message.trim())
            .filter(|message| !message.is_empty())
            .map(str::to_string)
            .collect();
        if pool.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "commit_messages".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        let mut cfg = self.load();
        cfg.commit_messages = pool;
        self.save(&cfg)
    }

    pub fn add_message(&self, text: &str) -> Result<()> {
        self.update_messages(|pool| messages::add_message(pool, text))
    }

    /// Replace the message at 1-based `position`, returning the old text.
    pub fn edit_message(&self, position: usize, text: &str) -> Result<String> {
        self.update_messages(|pool| messages::edit_message(pool, position, text))
    }

    /// Remove the message at 1-based `position`. The last message cannot be removed.
    pub fn remove_message(&self, position: usize) -> Result<String> {
        self.update_messages(|pool| messages::remove_message(pool, position))
    }

    fn update_messages<T>(
        &self,
        edit: impl FnOnce(&mut Vec<String>) -> Result<T, MessageError>,
    ) -> Result<T> {
        let mut cfg = self.load();
        let out = edit(&mut cfg.commit_messages)?;
        self.save(&cfg)?;
        Ok(out)
    }
}

fn read_config(path: &Path) -> Result<Option<Configuration>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg = serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(cfg))
}

/// Atomically write pretty JSON with a trailing newline (temp file + rename).
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut buf = serde_json::to_string_pretty(value).context("serialize config json")?;
    buf.push('\n');
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn store() -> (tempfile::TempDir, ConfigStore) {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(temp.path().join("cfg"));
        (temp, store)
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("valid time")
    }

    #[test]
    fn load_missing_creates_defaults() {
        let (_temp, store) = store();
        let cfg = store.load();
        assert_eq!(cfg, Configuration::default());
        assert!(store.path().exists());
        let raw = fs::read_to_string(store.path()).expect("read");
        assert!(raw.ends_with("}\n"));
        assert!(raw.contains("\"commit_messages\""));
    }

    #[test]
    fn malformed_file_degrades_to_defaults_and_is_kept_aside() {
        let (_temp, store) = store();
        fs::create_dir_all(store.dir()).expect("mkdir");
        fs::write(store.path(), "{ not json").expect("write");

        let cfg = store.load();
        assert_eq!(cfg, Configuration::default());
        let aside = store.path().with_extension("json.corrupt");
        assert_eq!(fs::read_to_string(aside).expect("read aside"), "{ not json");
        assert_eq!(store.load(), Configuration::default());
    }

    #[test]
    fn unknown_keys_survive_a_save() {
        let (_temp, store) = store();
        fs::create_dir_all(store.dir()).expect("mkdir");
        fs::write(
            store.path(),
            r#"{"github_username":"octo","repository_path":"/tmp/x"}"#,
        )
        .expect("write");

        store.set("github_token", json!("t0k")).expect("set");
        assert_eq!(store.get("repository_path"), Some(json!("/tmp/x")));
        assert_eq!(store.get("github_username"), Some(json!("octo")));
        assert_eq!(store.get("github_token"), Some(json!("t0k")));
    }

    #[test]
    fn empty_message_pool_on_disk_loads_defaults() {
        let (_temp, store) = store();
        fs::create_dir_all(store.dir()).expect("mkdir");
        fs::write(store.path(), r#"{"commit_messages":[]}"#).expect("write");
        assert_eq!(store.messages(), default_messages());
    }

    #[test]
    fn set_rejects_wrong_shape_and_empty_pool() {
        let (_temp, store) = store();
        store.load();
        let before = fs::read_to_string(store.path()).expect("read");

        let err = store.set("commit_messages", json!(42)).expect_err("wrong type");
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidValue { .. })
        ));
        let err = store.set("commit_messages", json!([])).expect_err("empty pool");
        assert!(err.to_string().contains("must not be empty"));
        assert_eq!(fs::read_to_string(store.path()).expect("read"), before);
    }

    #[test]
    fn set_validates_patterns() {
        let (_temp, store) = store();
        store
            .set("commit_patterns", json!({"light": {"min": 1, "max": 3}}))
            .expect("valid pattern");
        assert!(
            store
                .set("commit_patterns", json!({"bad": {"min": 4, "max": 3}}))
                .is_err()
        );
        assert_eq!(
            store.load().commit_patterns.get("light"),
            Some(&CommitPattern { min: 1, max: 3 })
        );
    }

    #[test]
    fn backups_in_the_same_second_do_not_collide() {
        let (_temp, store) = store();
        let first = store.backup_at(noon()).expect("backup");
        let second = store.backup_at(noon()).expect("backup");
        assert_ne!(first, second);
        assert!(first.ends_with("config_backup_20260301_120000.json"));
        assert!(second.ends_with("config_backup_20260301_120000_2.json"));

        let listed = store.list_backups().expect("list");
        assert_eq!(listed, vec![second, first]);
    }

    #[test]
    fn list_backups_ignores_other_files() {
        let (_temp, store) = store();
        store.load();
        fs::write(store.dir().join("notes.json"), "{}").expect("write");
        assert!(store.list_backups().expect("list").is_empty());
    }

    #[test]
    fn restore_rejects_malformed_backup() {
        let (temp, store) = store();
        store.set("github_username", json!("keep")).expect("set");
        let bogus = temp.path().join("bogus.json");
        fs::write(&bogus, "[1, 2").expect("write");

        let err = store.restore(&bogus).expect_err("malformed");
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidBackup { .. })
        ));
        assert_eq!(store.load().github_username, "keep");
    }

    #[test]
    fn credentials_require_both_fields() {
        let mut cfg = Configuration::default();
        assert_eq!(cfg.credentials(), None);
        cfg.github_username = "octo".to_string();
        assert_eq!(cfg.credentials(), None);
        cfg.github_token = " t ".to_string();
        assert_eq!(
            cfg.credentials(),
            Some(Credentials {
                username: "octo".to_string(),
                token: "t".to_string()
            })
        );
    }

    #[test]
    fn set_messages_drops_blanks_and_rejects_empty() {
        let (_temp, store) = store();
        store
            .set_messages(&[" a ".to_string(), "  ".to_string(), "b".to_string()])
            .expect("set");
        assert_eq!(store.messages(), vec!["a".to_string(), "b".to_string()]);
        assert!(store.set_messages(&[" ".to_string()]).is_err());
        assert_eq!(store.messages().len(), 2);
    }

    #[test]
    fn message_edits_persist() {
        let (_temp, store) = store();
        store.add_message("Tweak build").expect("add");
        assert_eq!(store.messages().last().map(String::as_str), Some("Tweak build"));
        let old = store.edit_message(1, "Write docs").expect("edit");
        assert_eq!(old, "Update documentation");
        assert_eq!(store.messages()[0], "Write docs");
        let removed = store.remove_message(2).expect("remove");
        assert_eq!(removed, "Fix typo");
        assert_eq!(store.messages().len(), 10);
    }
}
