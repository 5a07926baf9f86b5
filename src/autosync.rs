use crate::errors::{Result, ScorecardError};
use crate::storage::{Store, StorageKey};
use crate::sync::SyncService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Unattended periodic push. The on/off flag is persisted so the timer comes
/// back after a restart.
pub struct AutoSync {
    sync: Arc<SyncService>,
    store: Arc<Mutex<Store>>,
    period: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AutoSync {
    pub fn new(sync: Arc<SyncService>, store: Arc<Mutex<Store>>, period: Duration) -> Self {
        Self {
            sync,
            store,
            period,
            task: Mutex::new(None),
        }
    }

    /// Starts the timer if it was enabled when the process last ran.
    pub async fn restore(&self) {
        if self.stored_flag().await {
            self.start().await;
        }
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<()> {
        let flag = if enabled { "true" } else { "false" };
        self.store
            .lock()
            .await
            .set_string(StorageKey::AutoSync, flag)
            .await?;

        if enabled {
            self.start().await;
        } else {
            self.stop().await;
        }
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub async fn stored_flag(&self) -> bool {
        self.store
            .lock()
            .await
            .get_string(StorageKey::AutoSync)
            .as_deref()
            == Some("true")
    }

    async fn start(&self) {
        let mut task = self.task.lock().await;
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let sync = Arc::clone(&self.sync);
        let store = Arc::clone(&self.store);
        let period = self.period;
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match sync.push(&store, None).await {
                    Ok(report) => info!(gist_id = %report.gist_id, "auto-sync pushed"),
                    Err(ScorecardError::SyncInProgress) => debug!("auto-sync tick skipped, sync in flight"),
                    Err(err) => warn!("auto-sync failed: {err}"),
                }
            }
        }));
        info!(interval_secs = period.as_secs(), "auto-sync enabled");
    }

    async fn stop(&self) {
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
            info!("auto-sync disabled");
        }
    }
}

impl Drop for AutoSync {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}
