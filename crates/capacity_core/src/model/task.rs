//! Task instance domain model.
//!
//! # Responsibility
//! - Define the concrete, dated task record shared by pool/daily/series views.
//! - Provide lifecycle helpers for completion, soft-delete and partial updates.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `recurrence` is `Some` only for instances that belong to a live series.
//! - The series signature is derived from `(title, recurrence)` and never stored
//!   independently of them.
//! - `is_deleted` is the source of truth for tombstone state.
//! - `series_anchor` is written once when a series is created and copied
//!   verbatim to every later member; edits to one member never move it.
//! - Subtask ids are unique within their parent task.

use crate::model::rule::{compute_signature, RecurrenceRule, RuleValidationError, SeriesSignature};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one task instance.
pub type TaskId = Uuid;

/// Stable identifier for a project (task container).
pub type ProjectId = Uuid;

/// Optional stable series identifier carried next to the signature.
pub type SeriesId = Uuid;

/// Identifier of a checklist item inside one task.
pub type SubtaskId = Uuid;

/// Returns the current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Validation errors for task instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Nil UUID is reserved and never identifies a task or subtask.
    NilId,
    /// Title is blank after trim.
    BlankTitle,
    /// Recurrence rule has an invalid shape.
    Rule(RuleValidationError),
    BlankSubtaskTitle(SubtaskId),
    DuplicateSubtask(SubtaskId),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "task id must not be nil"),
            Self::BlankTitle => write!(f, "task title must not be blank"),
            Self::Rule(err) => write!(f, "invalid recurrence rule: {err}"),
            Self::BlankSubtaskTitle(id) => write!(f, "subtask {id} has a blank title"),
            Self::DuplicateSubtask(id) => write!(f, "subtask id {id} appears more than once"),
        }
    }
}

impl Error for TaskValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Rule(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RuleValidationError> for TaskValidationError {
    fn from(value: RuleValidationError) -> Self {
        Self::Rule(value)
    }
}

/// One checklist item of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
}

impl Subtask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            is_completed: false,
        }
    }
}

/// Concrete task record, either one-off or one dated member of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInstance {
    pub id: TaskId,
    pub title: String,
    pub is_completed: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Calendar date without time. `None` means the task sits in the pool.
    pub scheduled_date: Option<NaiveDate>,
    /// Planned effort in minutes.
    pub estimated_minutes: Option<u32>,
    pub recurrence: Option<RecurrenceRule>,
    /// Stable series id. Informational only; grouping uses the signature.
    pub series_id: Option<SeriesId>,
    /// Date that fixes the interval phase of the series this task was
    /// generated for. Absent on one-off tasks and on legacy records.
    #[serde(default)]
    pub series_anchor: Option<NaiveDate>,
    pub project_id: Option<ProjectId>,
    /// Position within `project_id`.
    pub project_order: Option<u32>,
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    pub is_deleted: bool,
}

impl TaskInstance {
    /// Creates a one-off task with a generated stable ID.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id_unchecked(Uuid::new_v4(), title.into())
    }

    /// Creates a one-off task with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(id: TaskId, title: impl Into<String>) -> Result<Self, TaskValidationError> {
        if id.is_nil() {
            return Err(TaskValidationError::NilId);
        }
        Ok(Self::with_id_unchecked(id, title.into()))
    }

    fn with_id_unchecked(id: TaskId, title: String) -> Self {
        Self {
            id,
            title,
            is_completed: false,
            created_at: now_epoch_ms(),
            scheduled_date: None,
            estimated_minutes: None,
            recurrence: None,
            series_id: None,
            series_anchor: None,
            project_id: None,
            project_order: None,
            notes: None,
            tags: Vec::new(),
            subtasks: Vec::new(),
            is_deleted: false,
        }
    }

    /// Series signature of this instance, `None` for one-off tasks.
    pub fn signature(&self) -> Option<SeriesSignature> {
        compute_signature(&self.title, self.recurrence.as_ref())
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Estimated minutes with absent treated as zero.
    pub fn planned_minutes(&self) -> u32 {
        self.estimated_minutes.unwrap_or(0)
    }

    /// Returns whether this task is scheduled on `date` and not tombstoned.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.is_active() && self.scheduled_date == Some(date)
    }

    /// Builds the next member of this task's series on `date`.
    ///
    /// Copies title, estimate, tags, rule, series id and series anchor.
    /// Subtasks are copied as an unchecked list with fresh ids. Everything
    /// else starts fresh: new id, not completed, no project link, no notes.
    pub fn spawn_occurrence(&self, date: NaiveDate, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: self.title.clone(),
            is_completed: false,
            created_at,
            scheduled_date: Some(date),
            estimated_minutes: self.estimated_minutes,
            recurrence: self.recurrence.clone(),
            series_id: self.series_id,
            series_anchor: self.series_anchor,
            project_id: None,
            project_order: None,
            notes: None,
            tags: self.tags.clone(),
            subtasks: self
                .subtasks
                .iter()
                .map(|subtask| Subtask::new(subtask.title.clone()))
                .collect(),
            is_deleted: false,
        }
    }

    pub fn toggle_completed(&mut self) {
        self.is_completed = !self.is_completed;
    }

    /// Flips one subtask. Returns `false` when no subtask has `subtask_id`.
    pub fn toggle_subtask(&mut self, subtask_id: SubtaskId) -> bool {
        match self.subtasks.iter_mut().find(|subtask| subtask.id == subtask_id) {
            Some(subtask) => {
                subtask.is_completed = !subtask.is_completed;
                true
            }
            None => false,
        }
    }

    /// `(completed, total)` over this task's subtasks.
    pub fn subtask_progress(&self) -> (usize, usize) {
        let completed = self
            .subtasks
            .iter()
            .filter(|subtask| subtask.is_completed)
            .count();
        (completed, self.subtasks.len())
    }

    /// Marks this task as softly deleted (tombstoned).
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    /// Clears soft delete flag.
    pub fn restore(&mut self) {
        self.is_deleted = false;
    }

    /// Returns whether this task should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Validates identity, title and rule shape.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.is_nil() {
            return Err(TaskValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::BlankTitle);
        }
        if let Some(rule) = &self.recurrence {
            rule.validate()?;
        }
        let mut seen = HashSet::with_capacity(self.subtasks.len());
        for subtask in &self.subtasks {
            if subtask.id.is_nil() {
                return Err(TaskValidationError::NilId);
            }
            if subtask.title.trim().is_empty() {
                return Err(TaskValidationError::BlankSubtaskTitle(subtask.id));
            }
            if !seen.insert(subtask.id) {
                return Err(TaskValidationError::DuplicateSubtask(subtask.id));
            }
        }
        Ok(())
    }

    /// Applies every field present in `patch`; absent fields stay untouched.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(is_completed) = patch.is_completed {
            self.is_completed = is_completed;
        }
        if let Some(scheduled_date) = patch.scheduled_date {
            self.scheduled_date = scheduled_date;
        }
        if let Some(estimated_minutes) = patch.estimated_minutes {
            self.estimated_minutes = estimated_minutes;
        }
        if let Some(recurrence) = &patch.recurrence {
            self.recurrence = recurrence.clone();
        }
        if let Some(series_id) = patch.series_id {
            self.series_id = series_id;
        }
        if let Some(project_id) = patch.project_id {
            self.project_id = project_id;
        }
        if let Some(project_order) = patch.project_order {
            self.project_order = project_order;
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(subtasks) = &patch.subtasks {
            self.subtasks = subtasks.clone();
        }
        if let Some(is_deleted) = patch.is_deleted {
            self.is_deleted = is_deleted;
        }
    }
}

/// Partial update for one task instance.
///
/// Outer `None` leaves the field unchanged. For nullable fields,
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
    pub scheduled_date: Option<Option<NaiveDate>>,
    pub estimated_minutes: Option<Option<u32>>,
    pub recurrence: Option<Option<RecurrenceRule>>,
    pub series_id: Option<Option<SeriesId>>,
    pub project_id: Option<Option<ProjectId>>,
    pub project_order: Option<Option<u32>>,
    pub notes: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub subtasks: Option<Vec<Subtask>>,
    pub is_deleted: Option<bool>,
}

impl TaskPatch {
    /// Clears the rule reference, detaching the instance from its series.
    pub fn detach_series() -> Self {
        Self {
            recurrence: Some(None),
            ..Self::default()
        }
    }

    /// Clears the owning container reference and position.
    pub fn unlink_container() -> Self {
        Self {
            project_id: Some(None),
            project_order: Some(None),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
