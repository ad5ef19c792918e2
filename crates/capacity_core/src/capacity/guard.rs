//! Capacity guard and per-day load views.

use crate::model::task::TaskInstance;
use chrono::{Days, NaiveDate};
use serde::Serialize;

/// Longest range `daily_loads` will walk.
pub const MAX_LOAD_VIEW_DAYS: u64 = 366;

/// Outcome of checking a new increment against one date's budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityReport {
    pub date: NaiveDate,
    pub budget_minutes: u32,
    /// Planned minutes on the date, completed tasks included.
    pub used_minutes: u64,
    /// Planned minutes on the date from tasks not yet completed.
    pub open_minutes: u64,
    /// `budget - used`; negative once the date is already over budget.
    pub remaining_minutes: i64,
    pub new_minutes: u32,
    /// `used + new`.
    pub projected_total: u64,
    /// `projected_total > budget`.
    pub exceeds: bool,
}

/// Load summary for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayLoad {
    pub date: NaiveDate,
    pub used_minutes: u64,
    pub open_minutes: u64,
    pub task_count: usize,
    pub over_budget: bool,
}

/// Checks whether adding `new_minutes` on `date` would exceed `budget_minutes`.
///
/// Only active instances scheduled on `date` are counted, so callers may pass
/// a wider slice than the date's own tasks. Absent estimates count as zero.
pub fn check_capacity<'a, I>(
    existing: I,
    date: NaiveDate,
    new_minutes: u32,
    budget_minutes: u32,
) -> CapacityReport
where
    I: IntoIterator<Item = &'a TaskInstance>,
{
    let (used_minutes, open_minutes, _) = sum_load(existing, date);
    let projected_total = used_minutes + u64::from(new_minutes);

    CapacityReport {
        date,
        budget_minutes,
        used_minutes,
        open_minutes,
        remaining_minutes: i64::from(budget_minutes) - to_i64(used_minutes),
        new_minutes,
        projected_total,
        exceeds: projected_total > u64::from(budget_minutes),
    }
}

/// Returns one [`DayLoad`] per date in `[start, end]`.
///
/// Returns an empty list for an inverted range; the range is capped at
/// [`MAX_LOAD_VIEW_DAYS`] days.
pub fn daily_loads(
    instances: &[TaskInstance],
    start: NaiveDate,
    end: NaiveDate,
    budget_minutes: u32,
) -> Vec<DayLoad> {
    if end < start {
        return Vec::new();
    }
    let span = (end - start).num_days().unsigned_abs().min(MAX_LOAD_VIEW_DAYS - 1);

    (0..=span)
        .filter_map(|offset| start.checked_add_days(Days::new(offset)))
        .map(|date| {
            let (used_minutes, open_minutes, task_count) = sum_load(instances, date);
            DayLoad {
                date,
                used_minutes,
                open_minutes,
                task_count,
                over_budget: used_minutes > u64::from(budget_minutes),
            }
        })
        .collect()
}

fn sum_load<'a, I>(instances: I, date: NaiveDate) -> (u64, u64, usize)
where
    I: IntoIterator<Item = &'a TaskInstance>,
{
    instances
        .into_iter()
        .filter(|instance| instance.is_active_on(date))
        .fold((0, 0, 0), |(used, open, count), instance| {
            let minutes = u64::from(instance.planned_minutes());
            let open_add = if instance.is_completed { 0 } else { minutes };
            (used + minutes, open + open_add, count + 1)
        })
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
