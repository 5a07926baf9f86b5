use crate::errors::AppError;
use crate::models::{
    numeric, ArchivedWeek, AutoSyncRequest, ChartsView, ConfirmRequest, DatesRequest, DayRequest,
    HistoryView, NoteRequest, ProfitRequest, Settings, SettingsRequest, SyncRequest,
    SyncStatusView, ToggleRequest, TokenRequest, WeekView,
};
use crate::state::AppState;
use crate::stats::{category_breakdown, compute_stats, day_summaries, goal_progress, trend_series};
use crate::storage::Store;
use crate::sync::{self, SyncReport};
use crate::{history, settings, week};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::Value;

pub async fn get_week(State(state): State<AppState>) -> Json<WeekView> {
    let store = state.store.lock().await;
    Json(week_view(&store))
}

pub async fn toggle(
    State(state): State<AppState>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<WeekView>, AppError> {
    let mut store = state.store.lock().await;
    week::toggle(&mut store, payload.day, payload.category).await?;
    Ok(Json(week_view(&store)))
}

pub async fn toggle_day_off(
    State(state): State<AppState>,
    Json(payload): Json<DayRequest>,
) -> Result<Json<WeekView>, AppError> {
    let mut store = state.store.lock().await;
    week::toggle_day_off(&mut store, payload.day).await?;
    Ok(Json(week_view(&store)))
}

pub async fn set_dates(
    State(state): State<AppState>,
    Json(payload): Json<DatesRequest>,
) -> Result<Json<WeekView>, AppError> {
    let mut store = state.store.lock().await;
    week::set_date_range(&mut store, payload.start, payload.end).await?;
    Ok(Json(week_view(&store)))
}

pub async fn set_note(
    State(state): State<AppState>,
    Json(payload): Json<NoteRequest>,
) -> Result<Json<WeekView>, AppError> {
    let mut store = state.store.lock().await;
    week::set_note(&mut store, payload.day, payload.note).await?;
    Ok(Json(week_view(&store)))
}

pub async fn reset_week(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<WeekView>, AppError> {
    let mut store = state.store.lock().await;
    week::reset(&mut store, payload.confirm).await?;
    Ok(Json(week_view(&store)))
}

pub async fn archive_week(
    State(state): State<AppState>,
    payload: Option<Json<ProfitRequest>>,
) -> Result<Json<ArchivedWeek>, AppError> {
    let payload = body_or_default(payload);
    let mut store = state.store.lock().await;
    let archived = week::archive(&mut store, profit_input(&payload.profit), Utc::now()).await?;
    Ok(Json(archived))
}

pub async fn get_history(State(state): State<AppState>) -> Json<HistoryView> {
    let store = state.store.lock().await;
    Json(history_view(&store))
}

pub async fn get_charts(State(state): State<AppState>) -> Json<ChartsView> {
    let store = state.store.lock().await;
    let weeks = history::list(&store);
    Json(ChartsView {
        trend: trend_series(&weeks),
        categories: category_breakdown(&weeks),
    })
}

pub async fn clear_history(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<HistoryView>, AppError> {
    let mut store = state.store.lock().await;
    history::clear(&mut store, payload.confirm).await?;
    Ok(Json(history_view(&store)))
}

pub async fn delete_history_item(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<HistoryView>, AppError> {
    let mut store = state.store.lock().await;
    history::delete_item(&mut store, index, payload.confirm).await?;
    Ok(Json(history_view(&store)))
}

pub async fn update_profit(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(payload): Json<ProfitRequest>,
) -> Result<Json<HistoryView>, AppError> {
    let mut store = state.store.lock().await;
    history::update_profit(&mut store, index, profit_input(&payload.profit)).await?;
    Ok(Json(history_view(&store)))
}

pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    let store = state.store.lock().await;
    Json(settings::load(&store))
}

pub async fn save_settings(
    State(state): State<AppState>,
    Json(payload): Json<SettingsRequest>,
) -> Result<Json<Settings>, AppError> {
    let updated = Settings::from_inputs(&payload.weekly_goal, &payload.perfect_days_goal);
    let mut store = state.store.lock().await;
    settings::save(&mut store, &updated).await?;
    Ok(Json(updated))
}

pub async fn reset_all(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<WeekView>, AppError> {
    let mut store = state.store.lock().await;
    settings::reset_all(&mut store, payload.confirm).await?;
    Ok(Json(week_view(&store)))
}

pub async fn save_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> Result<StatusCode, AppError> {
    let mut store = state.store.lock().await;
    sync::save_token(&mut store, &payload.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_token(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let mut store = state.store.lock().await;
    sync::remove_token(&mut store).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn push(
    State(state): State<AppState>,
    payload: Option<Json<SyncRequest>>,
) -> Result<Json<SyncReport>, AppError> {
    let payload = body_or_default(payload);
    let report = state.sync.push(&state.store, payload.gist_id).await?;
    Ok(Json(report))
}

pub async fn pull(
    State(state): State<AppState>,
    payload: Option<Json<SyncRequest>>,
) -> Result<Json<SyncReport>, AppError> {
    let payload = body_or_default(payload);
    let report = state.sync.pull(&state.store, payload.gist_id).await?;
    Ok(Json(report))
}

pub async fn set_auto_sync(
    State(state): State<AppState>,
    Json(payload): Json<AutoSyncRequest>,
) -> Result<Json<SyncStatusView>, AppError> {
    state.auto_sync.set_enabled(payload.enabled).await?;
    Ok(Json(sync_status(&state).await))
}

pub async fn get_sync_status(State(state): State<AppState>) -> Json<SyncStatusView> {
    Json(sync_status(&state).await)
}

async fn sync_status(state: &AppState) -> SyncStatusView {
    let status = state.sync.status().await;
    let auto_sync = state.auto_sync.stored_flag().await;
    let store = state.store.lock().await;
    SyncStatusView {
        status,
        has_token: sync::has_token(&store),
        gist_id: sync::stored_gist_id(&store),
        auto_sync,
    }
}

fn week_view(store: &Store) -> WeekView {
    let current = week::load(store);
    let started = current.is_some();
    let week = current.unwrap_or_default();
    let stats = started.then(|| compute_stats(&week));
    let settings = settings::load(store);

    WeekView {
        started,
        days: day_summaries(&week),
        goals: stats.as_ref().map(|stats| goal_progress(stats, &settings)),
        stats,
        week,
    }
}

fn history_view(store: &Store) -> HistoryView {
    HistoryView {
        weeks: history::list(store),
        summary: history::aggregate_stats(store),
    }
}

fn profit_input(value: &Value) -> Option<f64> {
    match value {
        Value::String(raw) => week::parse_profit(raw),
        other => numeric(other),
    }
}

/// Bodies whose fields are all optional may be left out entirely.
fn body_or_default<T: Default>(payload: Option<Json<T>>) -> T {
    payload.map(|Json(body)| body).unwrap_or_default()
}
