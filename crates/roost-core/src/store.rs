//! File-backed operator store.
//!
//! The store is an external collaborator of the session core: three JSON
//! files in the data directory (`info.json`, `settings.json`, `bots.json`),
//! created with defaults on first use. Settings are migrated on load and
//! persisted back only when the migrator actually changed something.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::settings::{migrate_settings, ServerInfo, Settings};

const INFO_FILE: &str = "info.json";
const SETTINGS_FILE: &str = "settings.json";
const BOTS_FILE: &str = "bots.json";

/// One stored bot account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account username, the session identity
    pub username: String,
    /// Password, present only for authenticated accounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Handle to the store directory.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    /// Open the store, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "Opened store");
        Ok(Self { dir })
    }

    /// The directory this store reads and writes.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the shared connection parameters.
    pub async fn server_info(&self) -> Result<ServerInfo> {
        self.load_or_create(INFO_FILE, ServerInfo::default).await
    }

    /// Persist the shared connection parameters.
    pub async fn save_server_info(&self, info: &ServerInfo) -> Result<()> {
        self.save(INFO_FILE, info).await
    }

    /// Load the fleet settings, migrating old schemas in place.
    pub async fn settings(&self) -> Result<Settings> {
        let mut raw: Value = self
            .load_or_create(SETTINGS_FILE, || {
                serde_json::to_value(Settings::default()).unwrap_or_default()
            })
            .await?;

        if migrate_settings(&mut raw) {
            info!("Migrated settings file to current schema");
            self.save(SETTINGS_FILE, &raw).await?;
        }

        serde_json::from_value(raw).map_err(Error::Json)
    }

    /// Persist the fleet settings.
    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.save(SETTINGS_FILE, settings).await
    }

    /// Load all stored accounts.
    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.load_or_create(BOTS_FILE, Vec::new).await
    }

    /// Look up one account by username.
    pub async fn account(&self, username: &str) -> Result<Option<Account>> {
        let accounts = self.accounts().await?;
        Ok(accounts.into_iter().find(|a| a.username == username))
    }

    /// Add or replace an account.
    pub async fn upsert_account(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts().await?;
        accounts.retain(|a| a.username != account.username);
        accounts.push(account);
        self.save(BOTS_FILE, &accounts).await
    }

    /// Remove an account. Returns whether it existed.
    pub async fn remove_account(&self, username: &str) -> Result<bool> {
        let mut accounts = self.accounts().await?;
        let before = accounts.len();
        accounts.retain(|a| a.username != username);
        let removed = accounts.len() != before;
        if removed {
            self.save(BOTS_FILE, &accounts).await?;
        }
        Ok(removed)
    }

    async fn load_or_create<T, F>(&self, file: &str, default: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        let path = self.dir.join(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::Store(format!("{} is not valid JSON: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let value = default();
                self.save(file, &value).await?;
                Ok(value)
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn save<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.dir.join(file);
        let json = serde_json::to_vec_pretty(value)?;
        // Write to a sibling temp file first so a crash never truncates data.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
