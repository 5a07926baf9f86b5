use crate::models::{
    ArchivedWeek, CategoryPoint, CategoryTally, DayGrade, DaySummary, GoalProgress,
    HistorySummary, Settings, TrendPoint, WeekRecord, WeekStats, CATEGORIES, CATEGORY_COUNT,
    WEEKDAYS,
};
use chrono::NaiveDate;

pub fn compute_stats(week: &WeekRecord) -> WeekStats {
    let mut category_totals = [CategoryTally::default(); CATEGORY_COUNT];
    let mut total_checked = 0u32;
    let mut perfect_days = 0u32;
    let mut active_days = 0u32;

    for day in week.days.iter().filter(|day| !day.is_day_off) {
        active_days += 1;
        for (tally, on) in category_totals.iter_mut().zip(day.toggles) {
            tally.total += 1;
            if on {
                tally.checked += 1;
            }
        }

        let checked = day.checked();
        total_checked += checked;
        if checked == CATEGORY_COUNT as u32 {
            perfect_days += 1;
        }
    }

    let total_possible = active_days * CATEGORY_COUNT as u32;

    WeekStats {
        total_checked,
        total_possible,
        percentage: percent(u64::from(total_checked), u64::from(total_possible)),
        perfect_days,
        active_days,
        category_stats: CATEGORIES
            .iter()
            .zip(category_totals)
            .map(|(name, tally)| (name.to_string(), tally))
            .collect(),
    }
}

/// Totals across the frozen snapshots. `None` when nothing is archived yet.
pub fn aggregate_history(history: &[ArchivedWeek]) -> Option<HistorySummary> {
    if history.is_empty() {
        return None;
    }

    let mut total_checked = 0u64;
    let mut total_possible = 0u64;
    let mut total_perfect = 0u64;
    for week in history {
        total_checked += u64::from(week.stats.total_checked);
        total_possible += u64::from(week.stats.total_possible);
        total_perfect += u64::from(week.stats.perfect_days);
    }

    let total_weeks = history.len();
    Some(HistorySummary {
        avg_percentage: percent(total_checked, total_possible),
        total_weeks,
        total_checked,
        total_possible,
        avg_perfect_days: round_tenth(total_perfect as f64 / total_weeks as f64),
    })
}

pub fn day_summaries(week: &WeekRecord) -> Vec<DaySummary> {
    week.days
        .iter()
        .zip(WEEKDAYS)
        .map(|(day, name)| {
            let sum = day.checked();
            let grade = if day.is_day_off {
                DayGrade::DayOff
            } else if sum == CATEGORY_COUNT as u32 {
                DayGrade::Perfect
            } else if f64::from(sum) >= CATEGORY_COUNT as f64 * 0.6 {
                DayGrade::Good
            } else {
                DayGrade::Poor
            };
            DaySummary { day: name, sum, grade }
        })
        .collect()
}

pub fn goal_progress(stats: &WeekStats, settings: &Settings) -> GoalProgress {
    GoalProgress {
        weekly_goal: settings.weekly_goal,
        weekly_goal_met: stats.percentage >= f64::from(settings.weekly_goal),
        perfect_days_goal: settings.perfect_days_goal,
        perfect_days_goal_met: stats.perfect_days >= u32::from(settings.perfect_days_goal),
    }
}

pub fn trend_series(history: &[ArchivedWeek]) -> Vec<TrendPoint> {
    history
        .iter()
        .enumerate()
        .map(|(index, archived)| TrendPoint {
            label: format!("Week {}", index + 1),
            start: short_date(&archived.week.date_range.start),
            percentage: archived.stats.percentage,
            profit: archived.profit.unwrap_or(0.0),
        })
        .collect()
}

/// Per-category completion summed over every archived snapshot.
pub fn category_breakdown(history: &[ArchivedWeek]) -> Vec<CategoryPoint> {
    CATEGORIES
        .iter()
        .map(|&category| {
            let mut tally = CategoryTally::default();
            for archived in history {
                if let Some(week_tally) = archived.stats.category_stats.get(category) {
                    tally.checked += week_tally.checked;
                    tally.total += week_tally.total;
                }
            }
            CategoryPoint {
                category,
                checked: tally.checked,
                total: tally.total,
                percentage: percent(u64::from(tally.checked), u64::from(tally.total)),
            }
        })
        .collect()
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_tenth(part as f64 / whole as f64 * 100.0)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn short_date(raw: &str) -> String {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.format("%d.%m").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
