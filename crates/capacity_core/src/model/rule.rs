//! Recurrence rules and series signatures.
//!
//! # Responsibility
//! - Represent a recurrence rule as a tagged variant (`daily` / `weekly`).
//! - Compute the stable series signature for a `(title, rule)` pair.
//!
//! # Invariants
//! - `interval >= 1` for every rule accepted by write paths.
//! - A weekly rule with an empty day set is valid and generates nothing.
//! - Signatures are pure functions of their inputs and stable across restarts.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Deterministic identity shared by every instance of one series.
pub type SeriesSignature = String;

const SIGNATURE_ENCODING_VERSION: &str = "v1";
const DAYS_IN_WEEK: u8 = 7;

/// Rule shape errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleValidationError {
    /// `interval` must be at least 1.
    ZeroInterval,
    /// Weekday numbers are `0` (Sunday) through `6` (Saturday).
    WeekdayOutOfRange(u8),
}

impl Display for RuleValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroInterval => write!(f, "recurrence interval must be >= 1"),
            Self::WeekdayOutOfRange(day) => {
                write!(f, "weekday number {day} is out of range 0..=6")
            }
        }
    }
}

impl Error for RuleValidationError {}

/// Set of weekdays, numbered `0 = Sunday` through `6 = Saturday`.
///
/// Serialized as a sorted array of weekday numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// Empty set. A weekly rule over it occupies no dates.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Builds a set from weekday numbers, ignoring duplicates.
    pub fn from_days(days: &[u8]) -> Result<Self, RuleValidationError> {
        let mut set = Self::empty();
        for &day in days {
            set.insert(day)?;
        }
        Ok(set)
    }

    /// Adds one weekday number.
    pub fn insert(&mut self, day: u8) -> Result<(), RuleValidationError> {
        if day >= DAYS_IN_WEEK {
            return Err(RuleValidationError::WeekdayOutOfRange(day));
        }
        self.0 |= 1 << day;
        Ok(())
    }

    pub fn contains(self, day: u8) -> bool {
        day < DAYS_IN_WEEK && self.0 & (1 << day) != 0
    }

    /// Returns whether `date` falls on a weekday in this set.
    pub fn contains_date(self, date: NaiveDate) -> bool {
        self.contains(weekday_number(date))
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Weekday numbers in ascending order.
    pub fn days(self) -> impl Iterator<Item = u8> {
        (0..DAYS_IN_WEEK).filter(move |day| self.contains(*day))
    }
}

impl TryFrom<Vec<u8>> for WeekdaySet {
    type Error = RuleValidationError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_days(&value)
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(value: WeekdaySet) -> Self {
        value.days().collect()
    }
}

/// Weekday number of `date`, `0 = Sunday`.
pub fn weekday_number(date: NaiveDate) -> u8 {
    // num_days_from_sunday is always in 0..7.
    date.weekday().num_days_from_sunday() as u8
}

fn default_interval() -> u32 {
    1
}

/// Recurrence rule attached to every instance of a recurring series.
///
/// Serialized with a `frequency` tag to match the external schema naming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "frequency", rename_all = "snake_case")]
pub enum RecurrenceRule {
    /// Every `interval` days.
    Daily {
        #[serde(default = "default_interval")]
        interval: u32,
        /// Last date the series may occupy.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_date: Option<NaiveDate>,
    },
    /// On `days_of_week`, every `interval` weeks.
    Weekly {
        #[serde(default = "default_interval")]
        interval: u32,
        #[serde(default)]
        days_of_week: WeekdaySet,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_date: Option<NaiveDate>,
    },
}

impl RecurrenceRule {
    /// Daily rule without an end date.
    pub fn daily(interval: u32) -> Self {
        Self::Daily {
            interval,
            end_date: None,
        }
    }

    /// Weekly rule without an end date.
    pub fn weekly(interval: u32, days_of_week: WeekdaySet) -> Self {
        Self::Weekly {
            interval,
            days_of_week,
            end_date: None,
        }
    }

    /// Returns a copy with the given end date.
    pub fn until(mut self, date: NaiveDate) -> Self {
        match &mut self {
            Self::Daily { end_date, .. } | Self::Weekly { end_date, .. } => {
                *end_date = Some(date)
            }
        }
        self
    }

    pub fn interval(&self) -> u32 {
        match self {
            Self::Daily { interval, .. } | Self::Weekly { interval, .. } => *interval,
        }
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Daily { end_date, .. } | Self::Weekly { end_date, .. } => *end_date,
        }
    }

    /// Stable frequency name used by persistence and signatures.
    pub fn frequency(&self) -> &'static str {
        match self {
            Self::Daily { .. } => "daily",
            Self::Weekly { .. } => "weekly",
        }
    }

    /// Returns a copy with interval `0` mapped to `1`.
    ///
    /// Callers normalize user input with this before it reaches the expander.
    pub fn normalized(mut self) -> Self {
        match &mut self {
            Self::Daily { interval, .. } | Self::Weekly { interval, .. } => {
                if *interval == 0 {
                    *interval = 1;
                }
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), RuleValidationError> {
        if self.interval() == 0 {
            return Err(RuleValidationError::ZeroInterval);
        }
        Ok(())
    }

    fn canonical_encoding(&self) -> String {
        let days = match self {
            Self::Daily { .. } => String::from("-"),
            Self::Weekly { days_of_week, .. } => days_of_week
                .days()
                .map(|day| day.to_string())
                .collect::<Vec<_>>()
                .join(","),
        };
        let end = self
            .end_date()
            .map_or_else(|| String::from("-"), |date| date.to_string());
        format!(
            "{}|{}|{}|{}",
            self.frequency(),
            self.interval(),
            days,
            end
        )
    }
}

/// Computes the series signature for `(title, rule)`.
///
/// Returns `None` for one-off tasks. Otherwise returns lowercase hex SHA-256
/// over a length-prefixed canonical encoding, so structurally equal inputs
/// always collide and any difference in title or rule changes the result.
pub fn compute_signature(title: &str, rule: Option<&RecurrenceRule>) -> Option<SeriesSignature> {
    let rule = rule?;
    let mut hasher = Sha256::new();
    hasher.update(SIGNATURE_ENCODING_VERSION.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(title.len().to_string().as_bytes());
    hasher.update(b":");
    hasher.update(title.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(rule.canonical_encoding().as_bytes());
    Some(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::{weekday_number, RecurrenceRule, WeekdaySet};
    use chrono::NaiveDate;

    #[test]
    fn weekday_number_starts_on_sunday() {
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        assert_eq!(weekday_number(sunday), 0);
        assert_eq!(weekday_number(monday), 1);
    }

    #[test]
    fn canonical_encoding_lists_days_in_order() {
        let rule = RecurrenceRule::weekly(2, WeekdaySet::from_days(&[5, 1, 3]).unwrap());
        assert_eq!(rule.canonical_encoding(), "weekly|2|1,3,5|-");
    }

    #[test]
    fn normalized_maps_zero_interval_to_one() {
        assert_eq!(RecurrenceRule::daily(0).normalized().interval(), 1);
        assert_eq!(RecurrenceRule::daily(4).normalized().interval(), 4);
    }
}
