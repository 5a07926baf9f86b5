use crate::errors::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::{collections::BTreeMap, env, path::Path, path::PathBuf};
use tokio::fs;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKey {
    CurrentWeek,
    History,
    Settings,
    GithubToken,
    GistId,
    AutoSync,
}

impl StorageKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKey::CurrentWeek => "current_week",
            StorageKey::History => "history",
            StorageKey::Settings => "settings",
            StorageKey::GithubToken => "github_token",
            StorageKey::GistId => "gist_id",
            StorageKey::AutoSync => "auto_sync",
        }
    }
}

pub fn resolve_data_path() -> PathBuf {
    if let Ok(path) = env::var("APP_DATA_PATH") {
        return PathBuf::from(path);
    }

    PathBuf::from("data/state.json")
}

/// String-keyed document store. Values are raw strings, JSON-encoded for
/// structured documents. The whole map is written to one file on every change.
#[derive(Debug, Default)]
pub struct Store {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl Store {
    pub async fn open(path: &Path) -> Self {
        let entries = match fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(err) => {
                    error!("failed to parse data file: {err}");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                error!("failed to read data file: {err}");
                BTreeMap::new()
            }
        };

        Self {
            path: Some(path.to_path_buf()),
            entries,
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn get_string(&self, key: StorageKey) -> Option<String> {
        self.entries.get(key.as_str()).cloned()
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: StorageKey) -> Option<T> {
        let raw = self.entries.get(key.as_str())?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(err) => {
                error!("failed to parse stored {}: {err}", key.as_str());
                None
            }
        }
    }

    pub async fn set_string(&mut self, key: StorageKey, value: impl Into<String>) -> Result<()> {
        let mut next = self.entries.clone();
        next.insert(key.as_str().to_string(), value.into());
        self.commit(next).await
    }

    pub async fn set_json<T: Serialize>(&mut self, key: StorageKey, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set_string(key, raw).await
    }

    pub async fn remove(&mut self, key: StorageKey) -> Result<()> {
        if !self.entries.contains_key(key.as_str()) {
            return Ok(());
        }
        let mut next = self.entries.clone();
        next.remove(key.as_str());
        self.commit(next).await
    }

    /// Removes several keys with a single write.
    pub async fn remove_all(&mut self, keys: &[StorageKey]) -> Result<()> {
        let mut next = self.entries.clone();
        for key in keys {
            next.remove(key.as_str());
        }
        self.commit(next).await
    }

    // The in-memory map only changes once the file write went through.
    async fn commit(&mut self, next: BTreeMap<String, String>) -> Result<()> {
        if let Some(path) = &self.path {
            let payload = serde_json::to_vec_pretty(&next)?;
            fs::write(path, payload).await?;
        }
        self.entries = next;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn unique_path(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = env::temp_dir();
        path.push(format!("scorecard_{tag}_{}_{}.json", std::process::id(), nanos));
        path
    }

    /// Points the store at a directory so every later write fails.
    pub async fn break_writes(mut store: Store) -> Store {
        let dir = unique_path("broken");
        fs::create_dir_all(&dir).await.unwrap();
        store.path = Some(dir);
        store
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let path = unique_path("reopen");
        let mut store = Store::open(&path).await;
        store.set_string(StorageKey::GistId, "abc123").await.unwrap();
        store.set_json(StorageKey::History, &vec![1, 2, 3]).await.unwrap();

        let reopened = Store::open(&path).await;
        assert_eq!(reopened.get_string(StorageKey::GistId).as_deref(), Some("abc123"));
        assert_eq!(reopened.get_json::<Vec<u32>>(StorageKey::History), Some(vec![1, 2, 3]));

        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn corrupt_file_opens_empty() {
        let path = unique_path("corrupt");
        fs::write(&path, b"not json").await.unwrap();

        let store = Store::open(&path).await;
        assert_eq!(store.get_string(StorageKey::CurrentWeek), None);

        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn unparsable_value_reads_as_absent() {
        let mut store = Store::in_memory();
        store.set_string(StorageKey::Settings, "{oops").await.unwrap();
        assert!(store.get_json::<serde_json::Value>(StorageKey::Settings).is_none());
        assert!(store.get_string(StorageKey::Settings).is_some());
    }

    #[tokio::test]
    async fn failed_write_leaves_store_unchanged() {
        let mut store = break_writes(Store::in_memory()).await;
        assert!(store.set_string(StorageKey::GistId, "abc").await.is_err());
        assert_eq!(store.get_string(StorageKey::GistId), None);
    }
}
