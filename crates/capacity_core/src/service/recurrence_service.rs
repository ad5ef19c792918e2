//! Series lifecycle service.
//!
//! # Responsibility
//! - Run the replenisher against the repository and persist its plan.
//! - Stop a series by detaching every member from its rule.
//! - Unlink tasks from a container without deleting them.
//!
//! # Invariants
//! - Each series is appended independently; one failed append never rolls
//!   back another series.
//! - Nothing here deletes a task.
//! - Every operation is safe to repeat.

use crate::model::rule::SeriesSignature;
use crate::model::settings::MAX_HORIZON_DAYS;
use crate::model::task::{now_epoch_ms, ProjectId, TaskPatch};
use crate::recurrence::replenish::{plan_replenishment, SkippedSeries};
use crate::repo::error::RepoError;
use crate::repo::task_repo::TaskRepository;
use chrono::{Days, NaiveDate};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

#[derive(Debug)]
pub enum RecurrenceServiceError {
    /// Horizon is zero, above the configured maximum, or past the calendar range.
    InvalidHorizon(u32),
    Repo(RepoError),
}

impl Display for RecurrenceServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHorizon(days) => {
                write!(f, "horizon of {days} days is out of range 1..={MAX_HORIZON_DAYS}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RecurrenceServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidHorizon(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for RecurrenceServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Series whose planned instances could not be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSeries {
    pub signature: SeriesSignature,
    pub message: String,
}

/// Outcome of one replenishment pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplenishReport {
    pub horizon: NaiveDate,
    pub series_extended: usize,
    pub instances_created: usize,
    pub skipped: Vec<SkippedSeries>,
    pub failed: Vec<FailedSeries>,
}

/// Recurrence controller and replenisher over a task repository.
pub struct RecurrenceService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> RecurrenceService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Extends every live series so its latest instance reaches
    /// `today + horizon_days`.
    ///
    /// # Errors
    /// - `InvalidHorizon` when `horizon_days` is outside `1..=MAX_HORIZON_DAYS`.
    /// - `Repo` when the collection cannot be read. Per-series write
    ///   failures are reported in [`ReplenishReport::failed`] instead.
    pub fn replenish(
        &self,
        today: NaiveDate,
        horizon_days: u32,
    ) -> Result<ReplenishReport, RecurrenceServiceError> {
        let started_at = Instant::now();
        if horizon_days == 0 || horizon_days > MAX_HORIZON_DAYS {
            return Err(RecurrenceServiceError::InvalidHorizon(horizon_days));
        }
        let horizon = today
            .checked_add_days(Days::new(u64::from(horizon_days)))
            .ok_or(RecurrenceServiceError::InvalidHorizon(horizon_days))?;

        let instances = self.repo.list_all()?;
        let plan = plan_replenishment(&instances, horizon, now_epoch_ms());

        let mut report = ReplenishReport {
            horizon,
            series_extended: 0,
            instances_created: 0,
            skipped: plan.skipped,
            failed: Vec::new(),
        };

        for extension in plan.extensions {
            match self.repo.append(&extension.instances) {
                Ok(()) => {
                    report.series_extended += 1;
                    report.instances_created += extension.instances.len();
                }
                Err(err) => {
                    error!(
                        "event=replenish_series module=recurrence status=error signature={} error={}",
                        extension.signature, err
                    );
                    report.failed.push(FailedSeries {
                        signature: extension.signature,
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            "event=replenish module=recurrence status=ok horizon={} series_extended={} created={} skipped={} failed={} duration_ms={}",
            horizon,
            report.series_extended,
            report.instances_created,
            report.skipped.len(),
            report.failed.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Detaches every instance carrying `signature` from its rule.
    ///
    /// Instances keep every other field and are never deleted. Returns the
    /// number of detached instances; a second call returns `0`.
    pub fn stop_series(&self, signature: &str) -> Result<usize, RecurrenceServiceError> {
        let members = self.repo.list_by_signature(signature)?;
        let patch = TaskPatch::detach_series();
        for member in &members {
            self.repo.update_fields(member.id, &patch)?;
        }

        info!(
            "event=series_stop module=recurrence status=ok signature={} detached={}",
            signature,
            members.len()
        );
        Ok(members.len())
    }

    /// Clears the container reference (and position) on every linked task.
    ///
    /// Deleting the container itself is the caller's job. Returns the number
    /// of unlinked tasks.
    pub fn unlink_container(&self, project_id: ProjectId) -> Result<usize, RecurrenceServiceError> {
        let linked = self.repo.list_by_project(project_id)?;
        let patch = TaskPatch::unlink_container();
        for task in &linked {
            self.repo.update_fields(task.id, &patch)?;
        }

        info!(
            "event=container_unlink module=recurrence status=ok project_id={} unlinked={}",
            project_id,
            linked.len()
        );
        Ok(linked.len())
    }
}
