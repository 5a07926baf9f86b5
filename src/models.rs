use crate::sync::SyncStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const DAY_COUNT: usize = 5;
pub const CATEGORY_COUNT: usize = 5;

pub const WEEKDAYS: [&str; DAY_COUNT] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

pub const CATEGORIES: [&str; CATEGORY_COUNT] =
    ["AlertMode", "Limit", "Aligned", "Reset 5min", "Process/notPnL"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

impl DateRange {
    pub fn is_complete(&self) -> bool {
        !self.start.trim().is_empty() && !self.end.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    #[serde(default, with = "toggle_format")]
    pub toggles: [bool; CATEGORY_COUNT],
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub is_day_off: bool,
}

impl DayRecord {
    pub fn checked(&self) -> u32 {
        self.toggles.iter().filter(|on| **on).count() as u32
    }
}

/// The week being tracked. `days` always holds exactly [`DAY_COUNT`] entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekRecord {
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default = "empty_days", deserialize_with = "lenient::five_days")]
    pub days: Vec<DayRecord>,
}

impl Default for WeekRecord {
    fn default() -> Self {
        Self {
            date_range: DateRange::default(),
            days: empty_days(),
        }
    }
}

fn empty_days() -> Vec<DayRecord> {
    vec![DayRecord::default(); DAY_COUNT]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTally {
    pub checked: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekStats {
    pub total_checked: u32,
    pub total_possible: u32,
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub percentage: f64,
    pub perfect_days: u32,
    pub active_days: u32,
    #[serde(default)]
    pub category_stats: BTreeMap<String, CategoryTally>,
}

/// A week frozen into history. Only `profit` changes after archival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedWeek {
    #[serde(flatten)]
    pub week: WeekRecord,
    pub archived_at: DateTime<Utc>,
    pub stats: WeekStats,
    #[serde(default, deserialize_with = "lenient::optional_f64")]
    pub profit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(deserialize_with = "lenient::goal")]
    pub weekly_goal: u8,
    #[serde(deserialize_with = "lenient::goal")]
    pub perfect_days_goal: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            weekly_goal: 75,
            perfect_days_goal: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub avg_percentage: f64,
    pub total_weeks: usize,
    pub total_checked: u64,
    pub total_possible: u64,
    pub avg_perfect_days: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DayGrade {
    DayOff,
    Perfect,
    Good,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub day: &'static str,
    pub sum: u32,
    pub grade: DayGrade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub weekly_goal: u8,
    pub weekly_goal_met: bool,
    pub perfect_days_goal: u8,
    pub perfect_days_goal_met: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub label: String,
    pub start: String,
    pub percentage: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPoint {
    pub category: &'static str,
    pub checked: u32,
    pub total: u32,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct WeekView {
    pub started: bool,
    pub week: WeekRecord,
    pub stats: Option<WeekStats>,
    pub days: Vec<DaySummary>,
    pub goals: Option<GoalProgress>,
}

#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub weeks: Vec<ArchivedWeek>,
    pub summary: Option<HistorySummary>,
}

#[derive(Debug, Serialize)]
pub struct ChartsView {
    pub trend: Vec<TrendPoint>,
    pub categories: Vec<CategoryPoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusView {
    #[serde(flatten)]
    pub status: SyncStatus,
    pub has_token: bool,
    pub gist_id: Option<String>,
    pub auto_sync: bool,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub day: usize,
    pub category: usize,
}

#[derive(Debug, Deserialize)]
pub struct DayRequest {
    pub day: usize,
}

#[derive(Debug, Deserialize)]
pub struct DatesRequest {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub day: usize,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub confirm: bool,
}

/// Profit arrives as whatever the user typed: a number, a string or nothing.
#[derive(Debug, Default, Deserialize)]
pub struct ProfitRequest {
    #[serde(default)]
    pub profit: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub weekly_goal: Value,
    pub perfect_days_goal: Value,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

/// Body of push and pull. A gist id typed by the user wins over the stored one.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub gist_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AutoSyncRequest {
    pub enabled: bool,
}

/// Reads a number out of a loosely typed JSON value: numbers as-is, strings
/// parsed after trimming, everything else is not a number.
pub fn numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

mod toggle_format {
    use super::{numeric, CATEGORY_COUNT};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(toggles: &[bool; CATEGORY_COUNT], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(toggles.iter().map(|on| if *on { "1" } else { "0" }))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[bool; CATEGORY_COUNT], D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
        let mut toggles = [false; CATEGORY_COUNT];
        for (slot, value) in toggles.iter_mut().zip(raw.iter()) {
            *slot = match value {
                Value::Bool(on) => *on,
                other => numeric(other).is_some_and(|n| n.trunc() != 0.0),
            };
        }
        Ok(toggles)
    }
}

mod lenient {
    use super::{numeric, DayRecord, DAY_COUNT};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn five_days<'de, D>(deserializer: D) -> Result<Vec<DayRecord>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut days = Option::<Vec<DayRecord>>::deserialize(deserializer)?.unwrap_or_default();
        days.resize(DAY_COUNT, DayRecord::default());
        Ok(days)
    }

    pub fn f64_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(numeric(&Value::deserialize(deserializer)?).unwrap_or(0.0))
    }

    pub fn optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(numeric(&Value::deserialize(deserializer)?))
    }

    /// Goals written by hand or by another device are clamped on the way in.
    pub fn goal<'de, D>(deserializer: D) -> Result<u8, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(crate::settings::sanitize_goal(&Value::deserialize(deserializer)?))
    }
}
