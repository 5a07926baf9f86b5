use crate::errors::{Result, ScorecardError};
use crate::models::{ArchivedWeek, HistorySummary};
use crate::stats::aggregate_history;
use crate::storage::{Store, StorageKey};
use tracing::info;

/// Archived weeks in archival order. An unreadable document shows as empty;
/// anything that writes history back goes through [`load`] instead.
pub fn list(store: &Store) -> Vec<ArchivedWeek> {
    store.get_json(StorageKey::History).unwrap_or_default()
}

/// Strict read for read-modify-write paths: a stored document that does not
/// parse is an error, so it never gets overwritten by an empty list.
pub fn load(store: &Store) -> Result<Vec<ArchivedWeek>> {
    match store.get_string(StorageKey::History) {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

pub async fn save(store: &mut Store, weeks: &[ArchivedWeek]) -> Result<()> {
    store.set_json(StorageKey::History, &weeks).await
}

/// Removes the week at `index`. Returns `false` without touching storage when
/// there is no such week.
pub async fn delete_item(store: &mut Store, index: usize, confirmed: bool) -> Result<bool> {
    let mut weeks = load(store)?;
    if index >= weeks.len() {
        return Ok(false);
    }
    if !confirmed {
        return Err(ScorecardError::NotConfirmed("delete an archived week"));
    }

    let removed = weeks.remove(index);
    save(store, &weeks).await?;
    info!(
        start = %removed.week.date_range.start,
        end = %removed.week.date_range.end,
        "archived week deleted"
    );
    Ok(true)
}

/// Replaces the profit of one archived week. The frozen stats are untouched.
pub async fn update_profit(store: &mut Store, index: usize, profit: Option<f64>) -> Result<bool> {
    let mut weeks = load(store)?;
    let Some(week) = weeks.get_mut(index) else {
        return Ok(false);
    };
    week.profit = profit;
    save(store, &weeks).await?;
    Ok(true)
}

pub async fn clear(store: &mut Store, confirmed: bool) -> Result<()> {
    if !confirmed {
        return Err(ScorecardError::NotConfirmed("clear the whole history"));
    }
    store.remove(StorageKey::History).await?;
    info!("history cleared");
    Ok(())
}

pub fn aggregate_stats(store: &Store) -> Option<HistorySummary> {
    aggregate_history(&list(store))
}
