//! Core planning logic: recurring series, rolling horizon and daily capacity.
//! This crate is the single source of truth for planner invariants.

pub mod capacity;
pub mod db;
pub mod logging;
pub mod model;
pub mod recurrence;
pub mod repo;
pub mod service;

pub use capacity::guard::{check_capacity, daily_loads, CapacityReport, DayLoad};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::project::{Project, ProjectStatus, ProjectValidationError};
pub use model::rule::{
    compute_signature, weekday_number, RecurrenceRule, RuleValidationError, SeriesSignature,
    WeekdaySet,
};
pub use model::settings::{PlannerSettings, SettingsError};
pub use model::task::{
    ProjectId, SeriesId, Subtask, SubtaskId, TaskId, TaskInstance, TaskPatch, TaskValidationError,
};
pub use recurrence::expand::{days_between, expand, ExpandError, MAX_EXPANSION_SPAN_DAYS};
pub use recurrence::replenish::{
    plan_replenishment, replenish, ReplenishPlan, SeriesExtension, SkipReason, SkippedSeries,
};
pub use repo::error::{RepoError, RepoResult};
pub use repo::memory::InMemoryTaskRepository;
pub use repo::project_repo::{ProjectRepository, SqliteProjectRepository};
pub use repo::settings_repo::{SettingsRepository, SqliteSettingsRepository};
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use service::project_service::{
    ProjectProgress, ProjectService, ProjectServiceError, StepSchedule, STEP_SCHEDULE_WINDOW_DAYS,
};
pub use service::recurrence_service::{
    FailedSeries, RecurrenceService, RecurrenceServiceError, ReplenishReport,
};
pub use service::task_service::{TaskDraft, TaskService, TaskServiceError};

/// Minimal health-check API for host integration checks.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
