//! Backup of the three scorecard documents to a GitHub Gist.
//!
//! A sync moves whole documents: push uploads all three, pull replaces each
//! local document the gist carries a non-blank copy of. There is no merge;
//! the last writer wins.

use crate::errors::{Result, ScorecardError};
use crate::history;
use crate::models::{ArchivedWeek, Settings, WeekRecord};
use crate::storage::{Store, StorageKey};
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

pub const CURRENT_WEEK_FILE: &str = "current-week.json";
pub const HISTORY_FILE: &str = "history.json";
pub const SETTINGS_FILE: &str = "settings.json";

const GIST_DESCRIPTION: &str = "Trading Scorecard Data";
const USER_AGENT: &str = concat!("trading-scorecard/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GistFile {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GistPayload {
    pub description: String,
    pub public: bool,
    pub files: BTreeMap<String, GistFile>,
}

impl GistPayload {
    /// Absent documents are uploaded as empty JSON values.
    pub fn new(current: Option<String>, history: Option<String>, settings: Option<String>) -> Self {
        let files = [
            (CURRENT_WEEK_FILE, current.unwrap_or_else(|| "{}".into())),
            (HISTORY_FILE, history.unwrap_or_else(|| "[]".into())),
            (SETTINGS_FILE, settings.unwrap_or_else(|| "{}".into())),
        ]
        .into_iter()
        .map(|(name, content)| (name.to_string(), GistFile { content: Some(content) }))
        .collect();

        Self {
            description: GIST_DESCRIPTION.to_string(),
            public: false,
            files,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Gist {
    pub id: String,
    #[serde(default)]
    pub files: BTreeMap<String, Option<GistFile>>,
}

impl Gist {
    fn content(&self, name: &str) -> Option<&str> {
        self.files
            .get(name)?
            .as_ref()?
            .content
            .as_deref()
            .filter(|content| !content.trim().is_empty())
    }
}

/// Gist REST client. Every non-2xx answer becomes [`ScorecardError::Remote`].
#[derive(Debug, Clone)]
pub struct GistClient {
    client: Client,
    base_url: String,
}

impl GistClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn create(&self, token: &str, payload: &GistPayload) -> Result<Gist> {
        let request = self.client.post(self.url("/gists")).json(payload);
        self.send(request, token).await
    }

    pub async fn update(&self, token: &str, id: &str, payload: &GistPayload) -> Result<Gist> {
        let request = self
            .client
            .patch(self.url(&format!("/gists/{id}")))
            .json(payload);
        self.send(request, token).await
    }

    pub async fn fetch(&self, token: &str, id: &str) -> Result<Gist> {
        let request = self.client.get(self.url(&format!("/gists/{id}")));
        self.send(request, token).await
    }

    async fn send(&self, request: RequestBuilder, token: &str) -> Result<Gist> {
        let response = request
            .bearer_auth(token)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScorecardError::Remote {
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncPhase {
    Idle,
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncDirection {
    Push,
    Pull,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub direction: SyncDirection,
    pub success: bool,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub last: Option<SyncOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub gist_id: String,
    pub documents: Vec<&'static str>,
}

/// Runs push/pull against one gist, one operation at a time.
#[derive(Debug)]
pub struct SyncService {
    client: GistClient,
    in_flight: Mutex<()>,
    status: Mutex<SyncStatus>,
}

impl SyncService {
    pub fn new(client: GistClient) -> Self {
        Self {
            client,
            in_flight: Mutex::new(()),
            status: Mutex::new(SyncStatus {
                phase: SyncPhase::Idle,
                last: None,
            }),
        }
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.lock().await.clone()
    }

    /// Uploads all three documents. `gist_id` overrides the stored id; with
    /// neither, a new gist is created.
    pub async fn push(&self, store: &Mutex<Store>, gist_id: Option<String>) -> Result<SyncReport> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| ScorecardError::SyncInProgress)?;
        self.set_phase(SyncPhase::InFlight).await;
        let result = self.run_push(store, gist_id).await;
        self.finish(SyncDirection::Push, &result).await;
        result
    }

    /// Replaces local documents with the gist's copies. `gist_id` overrides the
    /// stored id and is remembered on success.
    pub async fn pull(&self, store: &Mutex<Store>, gist_id: Option<String>) -> Result<SyncReport> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| ScorecardError::SyncInProgress)?;
        self.set_phase(SyncPhase::InFlight).await;
        let result = self.run_pull(store, gist_id).await;
        self.finish(SyncDirection::Pull, &result).await;
        result
    }

    async fn run_push(&self, store: &Mutex<Store>, gist_id: Option<String>) -> Result<SyncReport> {
        let (token, gist_id, payload) = {
            let store = store.lock().await;
            let token = stored_token(&store)?;
            let current = store.get_string(StorageKey::CurrentWeek);
            if current.is_none() && history::list(&store).is_empty() {
                return Err(ScorecardError::NoData);
            }
            let payload = GistPayload::new(
                current,
                store.get_string(StorageKey::History),
                store.get_string(StorageKey::Settings),
            );
            (token, requested_or_stored(gist_id, &store), payload)
        };

        let gist = match &gist_id {
            Some(id) => self.client.update(&token, id, &payload).await?,
            None => self.client.create(&token, &payload).await?,
        };

        store
            .lock()
            .await
            .set_string(StorageKey::GistId, gist.id.clone())
            .await?;
        info!(gist_id = %gist.id, created = gist_id.is_none(), "pushed documents to gist");

        Ok(SyncReport {
            gist_id: gist.id,
            documents: vec![CURRENT_WEEK_FILE, HISTORY_FILE, SETTINGS_FILE],
        })
    }

    async fn run_pull(&self, store: &Mutex<Store>, gist_id: Option<String>) -> Result<SyncReport> {
        let (token, gist_id) = {
            let store = store.lock().await;
            let token = stored_token(&store)?;
            let gist_id = requested_or_stored(gist_id, &store)
                .ok_or(ScorecardError::MissingConfig("no gist id to pull from"))?;
            (token, gist_id)
        };

        let gist = self.client.fetch(&token, &gist_id).await?;
        let incoming = remote_documents(&gist)?;

        let mut store = store.lock().await;
        let mut documents = Vec::with_capacity(incoming.len());
        for (key, file, content) in incoming {
            store.set_string(key, content).await?;
            documents.push(file);
        }
        store.set_string(StorageKey::GistId, gist_id.clone()).await?;
        info!(gist_id = %gist_id, ?documents, "pulled documents from gist");

        Ok(SyncReport { gist_id, documents })
    }

    async fn set_phase(&self, phase: SyncPhase) {
        self.status.lock().await.phase = phase;
    }

    async fn finish<T>(&self, direction: SyncDirection, result: &Result<T>) {
        let (success, message) = match result {
            Ok(_) => (true, format!("{direction:?} completed")),
            Err(err) => {
                warn!(?direction, "sync failed: {err}");
                (false, err.to_string())
            }
        };
        let mut status = self.status.lock().await;
        status.phase = SyncPhase::Idle;
        status.last = Some(SyncOutcome {
            direction,
            success,
            message,
            at: Utc::now(),
        });
    }
}

pub async fn save_token(store: &mut Store, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ScorecardError::validation("token must not be empty"));
    }
    store.set_string(StorageKey::GithubToken, token).await
}

/// Forgets the token and the gist it was syncing with.
pub async fn remove_token(store: &mut Store) -> Result<()> {
    store
        .remove_all(&[StorageKey::GithubToken, StorageKey::GistId])
        .await
}

pub fn has_token(store: &Store) -> bool {
    stored_token(store).is_ok()
}

pub fn stored_gist_id(store: &Store) -> Option<String> {
    store
        .get_string(StorageKey::GistId)
        .filter(|id| !id.trim().is_empty())
}

fn requested_or_stored(gist_id: Option<String>, store: &Store) -> Option<String> {
    gist_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .or_else(|| stored_gist_id(store))
}

fn stored_token(store: &Store) -> Result<String> {
    store
        .get_string(StorageKey::GithubToken)
        .filter(|token| !token.trim().is_empty())
        .ok_or(ScorecardError::MissingConfig("save a GitHub token first"))
}

/// Non-blank documents carried by the gist, each checked to parse before any
/// of them is written locally.
fn remote_documents(gist: &Gist) -> Result<Vec<(StorageKey, &'static str, String)>> {
    let mut documents = Vec::new();
    if let Some(content) = gist.content(CURRENT_WEEK_FILE) {
        check::<WeekRecord>(CURRENT_WEEK_FILE, content)?;
        documents.push((StorageKey::CurrentWeek, CURRENT_WEEK_FILE, content.to_string()));
    }
    if let Some(content) = gist.content(HISTORY_FILE) {
        check::<Vec<ArchivedWeek>>(HISTORY_FILE, content)?;
        documents.push((StorageKey::History, HISTORY_FILE, content.to_string()));
    }
    if let Some(content) = gist.content(SETTINGS_FILE) {
        // Stored in normalized form so out-of-range goals never reach disk.
        let settings = parse::<Settings>(SETTINGS_FILE, content)?;
        documents.push((StorageKey::Settings, SETTINGS_FILE, serde_json::to_string(&settings)?));
    }
    Ok(documents)
}

fn check<T: DeserializeOwned>(file: &'static str, content: &str) -> Result<()> {
    parse::<T>(file, content).map(|_| ())
}

fn parse<T: DeserializeOwned>(file: &'static str, content: &str) -> Result<T> {
    serde_json::from_str(content).map_err(|err| ScorecardError::InvalidRemote {
        file,
        reason: err.to_string(),
    })
}
