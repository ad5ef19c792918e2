//! Planner settings (daily capacity budget and replenish horizon).
//!
//! # Invariants
//! - Settings change only through an explicit save; readers never mutate them.
//! - `horizon_days` is bounded so series expansion stays a small constant.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default daily budget: 8 hours.
pub const DEFAULT_DAILY_CAPACITY_MINUTES: u32 = 480;
/// Default number of days a series is kept materialized ahead of today.
pub const DEFAULT_HORIZON_DAYS: u32 = 30;
/// Upper bound for `daily_capacity_minutes`.
pub const MAX_DAILY_CAPACITY_MINUTES: u32 = 24 * 60;
/// Upper bound for `horizon_days`.
pub const MAX_HORIZON_DAYS: u32 = 366;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    CapacityOutOfRange(u32),
    HorizonOutOfRange(u32),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapacityOutOfRange(value) => write!(
                f,
                "daily capacity {value} is out of range 0..={MAX_DAILY_CAPACITY_MINUTES} minutes"
            ),
            Self::HorizonOutOfRange(value) => {
                write!(f, "horizon {value} is out of range 1..={MAX_HORIZON_DAYS} days")
            }
        }
    }
}

impl Error for SettingsError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    /// Maximum estimated minutes per calendar date.
    pub daily_capacity_minutes: u32,
    /// Days into the future every series must stay materialized.
    pub horizon_days: u32,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            daily_capacity_minutes: DEFAULT_DAILY_CAPACITY_MINUTES,
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }
}

impl PlannerSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.daily_capacity_minutes > MAX_DAILY_CAPACITY_MINUTES {
            return Err(SettingsError::CapacityOutOfRange(
                self.daily_capacity_minutes,
            ));
        }
        if self.horizon_days == 0 || self.horizon_days > MAX_HORIZON_DAYS {
            return Err(SettingsError::HorizonOutOfRange(self.horizon_days));
        }
        Ok(())
    }
}
