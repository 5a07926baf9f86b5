use std::net::SocketAddr;
use tokio::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use trading_scorecard::{router, sync::GistClient, AppState, Config, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    if let Some(parent) = config.data_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let store = Store::open(&config.data_path).await;
    let client = GistClient::new(&config.gist_api_url)?;
    let state = AppState::new(store, client, config.auto_sync_interval);
    state.auto_sync.restore().await;

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(data_path = %config.data_path.display(), "listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
