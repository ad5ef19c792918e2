//! Task use-case service.
//!
//! # Responsibility
//! - Create one-off tasks and new recurring series.
//! - Provide completion, reschedule, pool and soft-delete operations.
//! - Maintain per-task subtask checklists.
//! - Expose the advisory capacity check for a prospective task.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Editing one instance never rewrites its siblings; a renamed instance
//!   leaves its old series.
//! - Capacity reports never block a write.

use crate::capacity::guard::{check_capacity, CapacityReport};
use crate::model::rule::RecurrenceRule;
use crate::model::task::{
    now_epoch_ms, ProjectId, Subtask, SubtaskId, TaskId, TaskInstance, TaskPatch,
};
use crate::recurrence::expand::{expand, ExpandError};
use crate::repo::error::RepoError;
use crate::repo::task_repo::TaskRepository;
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Errors from task service operations.
#[derive(Debug)]
pub enum TaskServiceError {
    /// Target task does not exist.
    TaskNotFound(TaskId),
    SubtaskNotFound { task: TaskId, subtask: SubtaskId },
    /// Series expansion rejected its inputs.
    Expand(ExpandError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::SubtaskNotFound { task, subtask } => {
                write!(f, "subtask {subtask} not found on task {task}")
            }
            Self::Expand(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TaskNotFound(_) | Self::SubtaskNotFound { .. } => None,
            Self::Expand(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::TaskNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ExpandError> for TaskServiceError {
    fn from(value: ExpandError) -> Self {
        Self::Expand(value)
    }
}

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Request model for a new task or the template of a new series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub scheduled_date: Option<NaiveDate>,
    pub estimated_minutes: Option<u32>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    /// Checklist item titles, in order.
    pub subtasks: Vec<String>,
    pub project_id: Option<ProjectId>,
    pub project_order: Option<u32>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.scheduled_date = Some(date);
        self
    }

    pub fn minutes(mut self, minutes: u32) -> Self {
        self.estimated_minutes = Some(minutes);
        self
    }

    pub fn tagged(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn checklist(mut self, items: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.subtasks = items.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn into_instance(self) -> TaskInstance {
        let mut task = TaskInstance::new(self.title.trim());
        task.scheduled_date = self.scheduled_date;
        task.estimated_minutes = self.estimated_minutes;
        task.notes = self.notes;
        task.tags = self.tags;
        task.subtasks = self
            .subtasks
            .iter()
            .map(|title| Subtask::new(title.trim()))
            .collect();
        task.project_id = self.project_id;
        task.project_order = self.project_order;
        task
    }
}

/// Use-case service wrapper for task operations.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one one-off task.
    pub fn create_task(&self, draft: TaskDraft) -> TaskServiceResult<TaskInstance> {
        let task = draft.into_instance();
        self.repo.append(std::slice::from_ref(&task))?;
        Ok(task)
    }

    /// Creates a recurring series and materializes it from `anchor` to `horizon`.
    ///
    /// The rule is normalized first (interval `0` becomes `1`). Every instance
    /// shares a fresh series id and stores `anchor` as its series anchor. The draft's scheduled date is ignored; dates
    /// come from the rule. When `horizon` precedes `anchor`, only the anchor
    /// date itself is considered.
    ///
    /// Returns the created instances in date order, possibly empty when the
    /// rule occupies no date in the window.
    pub fn create_series(
        &self,
        draft: TaskDraft,
        rule: RecurrenceRule,
        anchor: NaiveDate,
        horizon: NaiveDate,
    ) -> TaskServiceResult<Vec<TaskInstance>> {
        let rule = rule.normalized();
        let dates = expand(&rule, anchor, anchor, horizon.max(anchor))?;

        let mut template = draft.into_instance();
        template.project_id = None;
        template.project_order = None;
        template.recurrence = Some(rule);
        template.series_id = Some(Uuid::new_v4());
        template.series_anchor = Some(anchor);

        let created_at = now_epoch_ms();
        let instances: Vec<TaskInstance> = dates
            .into_iter()
            .map(|date| {
                let mut instance = template.spawn_occurrence(date, created_at);
                instance.notes = template.notes.clone();
                instance
            })
            .collect();

        if instances.is_empty() {
            warn!(
                "event=series_create module=task status=skip reason=no_qualifying_dates anchor={anchor} horizon={horizon}"
            );
            return Ok(instances);
        }

        self.repo.append(&instances)?;
        info!(
            "event=series_create module=task status=ok count={} anchor={}",
            instances.len(),
            anchor
        );
        Ok(instances)
    }

    /// Gets one task by id, tombstones included.
    pub fn get_task(&self, id: TaskId) -> TaskServiceResult<TaskInstance> {
        self.repo
            .get_task(id)?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }

    /// Flips the completion flag.
    pub fn toggle_completion(&self, id: TaskId) -> TaskServiceResult<TaskInstance> {
        let task = self.get_task(id)?;
        let patch = TaskPatch {
            is_completed: Some(!task.is_completed),
            ..TaskPatch::default()
        };
        Ok(self.repo.update_fields(id, &patch)?)
    }

    /// Appends an unchecked subtask to the end of the task's checklist.
    pub fn add_subtask(
        &self,
        id: TaskId,
        title: impl Into<String>,
    ) -> TaskServiceResult<TaskInstance> {
        let mut subtasks = self.get_task(id)?.subtasks;
        subtasks.push(Subtask::new(title.into().trim()));
        let patch = TaskPatch {
            subtasks: Some(subtasks),
            ..TaskPatch::default()
        };
        Ok(self.repo.update_fields(id, &patch)?)
    }

    /// Flips one subtask's completion flag. The parent's own flag is untouched.
    pub fn toggle_subtask(
        &self,
        id: TaskId,
        subtask_id: SubtaskId,
    ) -> TaskServiceResult<TaskInstance> {
        let mut task = self.get_task(id)?;
        if !task.toggle_subtask(subtask_id) {
            return Err(TaskServiceError::SubtaskNotFound {
                task: id,
                subtask: subtask_id,
            });
        }
        let patch = TaskPatch {
            subtasks: Some(task.subtasks),
            ..TaskPatch::default()
        };
        Ok(self.repo.update_fields(id, &patch)?)
    }

    /// Moves a task to `date`.
    pub fn reschedule(&self, id: TaskId, date: NaiveDate) -> TaskServiceResult<TaskInstance> {
        let patch = TaskPatch {
            scheduled_date: Some(Some(date)),
            ..TaskPatch::default()
        };
        Ok(self.repo.update_fields(id, &patch)?)
    }

    /// Clears the scheduled date, returning the task to the pool.
    pub fn move_to_pool(&self, id: TaskId) -> TaskServiceResult<TaskInstance> {
        let patch = TaskPatch {
            scheduled_date: Some(None),
            ..TaskPatch::default()
        };
        Ok(self.repo.update_fields(id, &patch)?)
    }

    /// Renames this instance only; siblings keep the old title and signature.
    pub fn rename(&self, id: TaskId, title: impl Into<String>) -> TaskServiceResult<TaskInstance> {
        let patch = TaskPatch {
            title: Some(title.into().trim().to_string()),
            ..TaskPatch::default()
        };
        Ok(self.repo.update_fields(id, &patch)?)
    }

    /// Applies an arbitrary partial update.
    pub fn update_task(&self, id: TaskId, patch: &TaskPatch) -> TaskServiceResult<TaskInstance> {
        Ok(self.repo.update_fields(id, patch)?)
    }

    /// Soft-deletes a task by id.
    pub fn delete_task(&self, id: TaskId) -> TaskServiceResult<()> {
        Ok(self.repo.soft_delete_task(id)?)
    }

    /// Active tasks scheduled on `date`.
    pub fn list_on(&self, date: NaiveDate) -> TaskServiceResult<Vec<TaskInstance>> {
        Ok(self.repo.list_scheduled_on(date)?)
    }

    /// Active unscheduled tasks.
    pub fn list_pool(&self) -> TaskServiceResult<Vec<TaskInstance>> {
        Ok(self.repo.list_unscheduled()?)
    }

    /// Reports what scheduling `new_minutes` more on `date` would do to the budget.
    ///
    /// Advisory only: callers decide whether to proceed when `exceeds` is set.
    pub fn preview_capacity(
        &self,
        date: NaiveDate,
        new_minutes: u32,
        budget_minutes: u32,
    ) -> TaskServiceResult<CapacityReport> {
        let existing = self.repo.list_scheduled_on(date)?;
        Ok(check_capacity(&existing, date, new_minutes, budget_minutes))
    }
}
