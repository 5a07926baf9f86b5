use crate::errors::{Result, ScorecardError};
use crate::models::{numeric, Settings};
use crate::storage::{Store, StorageKey};
use serde_json::Value;

const GOAL_MIN: i64 = 0;
const GOAL_MAX: i64 = 100;

impl Settings {
    /// Builds settings from raw form values. Out-of-range input is clamped and
    /// non-numeric input falls back to the minimum; nothing is rejected.
    pub fn from_inputs(weekly_goal: &Value, perfect_days_goal: &Value) -> Self {
        Self {
            weekly_goal: sanitize_goal(weekly_goal),
            perfect_days_goal: sanitize_goal(perfect_days_goal),
        }
    }
}

pub(crate) fn sanitize_goal(raw: &Value) -> u8 {
    let value = numeric(raw).map_or(GOAL_MIN, |n| n.trunc().clamp(-1e9, 1e9) as i64);
    value.clamp(GOAL_MIN, GOAL_MAX) as u8
}

pub fn load(store: &Store) -> Settings {
    store.get_json(StorageKey::Settings).unwrap_or_default()
}

pub async fn save(store: &mut Store, settings: &Settings) -> Result<()> {
    store.set_json(StorageKey::Settings, settings).await
}

/// Wipes the current week, history and settings. Sync credentials stay.
pub async fn reset_all(store: &mut Store, confirmed: bool) -> Result<()> {
    if !confirmed {
        return Err(ScorecardError::NotConfirmed("clear all data"));
    }
    store
        .remove_all(&[
            StorageKey::CurrentWeek,
            StorageKey::History,
            StorageKey::Settings,
        ])
        .await
}
