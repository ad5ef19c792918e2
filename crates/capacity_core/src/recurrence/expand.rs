//! Rule expansion over a closed date range.
//!
//! # Invariants
//! - Output is ascending and free of duplicates.
//! - Interval phase is computed from signed calendar-day differences to the
//!   anchor, normalized into `[0, interval)`.
//! - No date after the rule's `end_date` is produced.

use crate::model::rule::RecurrenceRule;
use chrono::{Days, NaiveDate};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Hard upper bound on the number of days one expansion may walk.
pub const MAX_EXPANSION_SPAN_DAYS: i64 = 3_660;

const DAYS_PER_WEEK: i64 = 7;

/// Invalid expansion inputs. Each one is a caller bug, not a data condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    /// Rule interval was not normalized to `>= 1`.
    ZeroInterval,
    /// `range_start` is after `range_end`.
    InvertedRange {
        range_start: NaiveDate,
        range_end: NaiveDate,
    },
    /// Range is wider than [`MAX_EXPANSION_SPAN_DAYS`].
    SpanTooLarge { span_days: i64 },
}

impl Display for ExpandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroInterval => write!(f, "recurrence interval must be >= 1"),
            Self::InvertedRange {
                range_start,
                range_end,
            } => write!(f, "range start {range_start} is after range end {range_end}"),
            Self::SpanTooLarge { span_days } => write!(
                f,
                "expansion span of {span_days} days exceeds limit of {MAX_EXPANSION_SPAN_DAYS}"
            ),
        }
    }
}

impl Error for ExpandError {}

/// Signed number of calendar days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Returns the dates in `[range_start, range_end]` occupied by `rule`.
///
/// `anchor` fixes the interval phase and may lie before, inside or after the
/// range.
///
/// # Errors
/// - [`ExpandError::ZeroInterval`] when the rule was not normalized.
/// - [`ExpandError::InvertedRange`] when `range_start > range_end`.
/// - [`ExpandError::SpanTooLarge`] when the effective range exceeds the bound.
pub fn expand(
    rule: &RecurrenceRule,
    anchor: NaiveDate,
    range_start: NaiveDate,
    range_end: NaiveDate,
) -> Result<Vec<NaiveDate>, ExpandError> {
    let interval = i64::from(rule.interval());
    if interval == 0 {
        return Err(ExpandError::ZeroInterval);
    }
    if range_start > range_end {
        return Err(ExpandError::InvertedRange {
            range_start,
            range_end,
        });
    }

    let effective_end = match rule.end_date() {
        Some(end_date) if end_date < range_end => end_date,
        _ => range_end,
    };
    if effective_end < range_start {
        return Ok(Vec::new());
    }
    if let RecurrenceRule::Weekly { days_of_week, .. } = rule {
        if days_of_week.is_empty() {
            return Ok(Vec::new());
        }
    }

    let span_days = days_between(range_start, effective_end);
    if span_days > MAX_EXPANSION_SPAN_DAYS {
        return Err(ExpandError::SpanTooLarge { span_days });
    }

    let mut dates = Vec::new();
    for offset in 0..=span_days.unsigned_abs() {
        let Some(date) = range_start.checked_add_days(Days::new(offset)) else {
            break;
        };
        if occurs_on(rule, interval, anchor, date) {
            dates.push(date);
        }
    }
    Ok(dates)
}

fn occurs_on(rule: &RecurrenceRule, interval: i64, anchor: NaiveDate, date: NaiveDate) -> bool {
    let offset = days_between(anchor, date);
    match rule {
        RecurrenceRule::Daily { .. } => offset.rem_euclid(interval) == 0,
        RecurrenceRule::Weekly { days_of_week, .. } => {
            days_of_week.contains_date(date)
                && offset.div_euclid(DAYS_PER_WEEK).rem_euclid(interval) == 0
        }
    }
}
