//! The single "current week" document: loading, field edits, reset and
//! archival into history.

use crate::errors::{Result, ScorecardError};
use crate::history;
use crate::models::{ArchivedWeek, DayRecord, WeekRecord, CATEGORY_COUNT, DAY_COUNT};
use crate::stats::compute_stats;
use crate::storage::{Store, StorageKey};
use chrono::{DateTime, Utc};
use tracing::info;

pub fn load(store: &Store) -> Option<WeekRecord> {
    store.get_json(StorageKey::CurrentWeek)
}

pub async fn save(store: &mut Store, week: &WeekRecord) -> Result<()> {
    store.set_json(StorageKey::CurrentWeek, week).await
}

pub async fn toggle(store: &mut Store, day: usize, category: usize) -> Result<WeekRecord> {
    edit(store, |week| {
        if category >= CATEGORY_COUNT {
            return Err(ScorecardError::validation(format!(
                "category must be below {CATEGORY_COUNT}"
            )));
        }
        let record = day_mut(week, day)?;
        record.toggles[category] = !record.toggles[category];
        Ok(())
    })
    .await
}

pub async fn toggle_day_off(store: &mut Store, day: usize) -> Result<WeekRecord> {
    edit(store, |week| {
        let record = day_mut(week, day)?;
        record.is_day_off = !record.is_day_off;
        Ok(())
    })
    .await
}

pub async fn set_date_range(store: &mut Store, start: String, end: String) -> Result<WeekRecord> {
    edit(store, |week| {
        week.date_range.start = start;
        week.date_range.end = end;
        Ok(())
    })
    .await
}

pub async fn set_note(store: &mut Store, day: usize, note: String) -> Result<WeekRecord> {
    edit(store, |week| {
        day_mut(week, day)?.note = note;
        Ok(())
    })
    .await
}

pub async fn reset(store: &mut Store, confirmed: bool) -> Result<()> {
    if !confirmed {
        return Err(ScorecardError::NotConfirmed("reset the current week"));
    }
    store.remove(StorageKey::CurrentWeek).await?;
    info!("current week reset");
    Ok(())
}

/// Freezes the current week into history and starts a fresh one.
///
/// History is written first; the current week is only cleared once that
/// write succeeded, so a storage failure never loses the week.
pub async fn archive(
    store: &mut Store,
    profit: Option<f64>,
    now: DateTime<Utc>,
) -> Result<ArchivedWeek> {
    let week = load(store).ok_or_else(|| ScorecardError::validation("no week data to archive"))?;
    if !week.date_range.is_complete() {
        return Err(ScorecardError::validation(
            "fill in the date range before archiving",
        ));
    }

    let archived = ArchivedWeek {
        stats: compute_stats(&week),
        week,
        archived_at: now,
        profit,
    };

    let mut weeks = history::load(store)?;
    weeks.push(archived.clone());
    history::save(store, &weeks).await?;
    store.remove(StorageKey::CurrentWeek).await?;

    info!(
        percentage = archived.stats.percentage,
        perfect_days = archived.stats.perfect_days,
        "week archived"
    );
    Ok(archived)
}

/// Parses the optional profit typed at archive time.
pub fn parse_profit(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

async fn edit<F>(store: &mut Store, apply: F) -> Result<WeekRecord>
where
    F: FnOnce(&mut WeekRecord) -> Result<()>,
{
    let mut week = load(store).unwrap_or_default();
    apply(&mut week)?;
    save(store, &week).await?;
    Ok(week)
}

fn day_mut(week: &mut WeekRecord, day: usize) -> Result<&mut DayRecord> {
    week.days
        .get_mut(day)
        .ok_or_else(|| ScorecardError::validation(format!("day must be below {DAY_COUNT}")))
}
