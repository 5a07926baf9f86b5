pub mod app;
pub mod autosync;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod history;
pub mod models;
pub mod settings;
pub mod state;
pub mod stats;
pub mod storage;
pub mod sync;
pub mod week;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::{resolve_data_path, Store};
