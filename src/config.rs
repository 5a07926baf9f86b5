use crate::autosync::DEFAULT_INTERVAL;
use crate::storage::resolve_data_path;
use crate::sync::DEFAULT_API_URL;
use std::{env, path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub port: u16,
    pub gist_api_url: String,
    pub auto_sync_interval: Duration,
}

impl Config {
    /// Reads `APP_DATA_PATH`, `PORT`, `GIST_API_URL` and
    /// `AUTO_SYNC_INTERVAL_SECS`, falling back to defaults for anything unset
    /// or unparsable.
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8080);

        let gist_api_url = env::var("GIST_API_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let auto_sync_interval = env::var("AUTO_SYNC_INTERVAL_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_INTERVAL);

        Self {
            data_path: resolve_data_path(),
            port,
            gist_api_url,
            auto_sync_interval,
        }
    }
}
