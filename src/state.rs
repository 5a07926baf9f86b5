use crate::autosync::AutoSync;
use crate::storage::Store;
use crate::sync::{GistClient, SyncService};
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<Store>>,
    pub sync: Arc<SyncService>,
    pub auto_sync: Arc<AutoSync>,
}

impl AppState {
    pub fn new(store: Store, client: GistClient, auto_sync_interval: Duration) -> Self {
        let store = Arc::new(Mutex::new(store));
        let sync = Arc::new(SyncService::new(client));
        let auto_sync = Arc::new(AutoSync::new(
            Arc::clone(&sync),
            Arc::clone(&store),
            auto_sync_interval,
        ));
        Self {
            store,
            sync,
            auto_sync,
        }
    }
}
