use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post, put}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/week", get(handlers::get_week))
        .route("/api/week/toggle", post(handlers::toggle))
        .route("/api/week/day-off", post(handlers::toggle_day_off))
        .route("/api/week/dates", put(handlers::set_dates))
        .route("/api/week/note", put(handlers::set_note))
        .route("/api/week/reset", post(handlers::reset_week))
        .route("/api/week/archive", post(handlers::archive_week))
        .route("/api/history", get(handlers::get_history))
        .route("/api/history/charts", get(handlers::get_charts))
        .route("/api/history/clear", post(handlers::clear_history))
        .route("/api/history/:index/delete", post(handlers::delete_history_item))
        .route("/api/history/:index/profit", put(handlers::update_profit))
        .route("/api/settings", get(handlers::get_settings).put(handlers::save_settings))
        .route("/api/reset-all", post(handlers::reset_all))
        .route("/api/sync/token", post(handlers::save_token))
        .route("/api/sync/token/remove", post(handlers::remove_token))
        .route("/api/sync/push", post(handlers::push))
        .route("/api/sync/pull", post(handlers::pull))
        .route("/api/sync/auto", put(handlers::set_auto_sync))
        .route("/api/sync/status", get(handlers::get_sync_status))
        .with_state(state)
}
