//! Project use-case service.
//!
//! # Responsibility
//! - Create, archive and delete projects.
//! - Keep step order for tasks added to a project.
//! - Instantiate templates into new active projects.
//! - Report step completion and lay unscheduled steps onto days with room.
//!
//! # Invariants
//! - Deleting a project never deletes a task; linked tasks are unlinked first.
//! - New steps are appended at `max(project_order) + 1`.
//! - Step scheduling never places a step on a day it would push over budget,
//!   and keeps step order on the calendar.

use crate::capacity::guard::check_capacity;
use crate::model::project::{Project, ProjectStatus};
use crate::model::task::{ProjectId, Subtask, TaskInstance, TaskPatch};
use crate::repo::error::RepoError;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::task_repo::TaskRepository;
use crate::service::recurrence_service::{RecurrenceService, RecurrenceServiceError};
use crate::service::task_service::TaskDraft;
use chrono::{Days, NaiveDate};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ProjectServiceError {
    ProjectNotFound(ProjectId),
    /// Project exists but does not have status `template`.
    NotTemplate(ProjectId),
    /// Unlinking linked tasks failed outside the repository.
    Recurrence(RecurrenceServiceError),
    Repo(RepoError),
}

impl Display for ProjectServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::NotTemplate(id) => write!(f, "project is not a template: {id}"),
            Self::Recurrence(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Recurrence(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ProjectServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::ProjectNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<RecurrenceServiceError> for ProjectServiceError {
    fn from(value: RecurrenceServiceError) -> Self {
        match value {
            RecurrenceServiceError::Repo(err) => err.into(),
            other => Self::Recurrence(other),
        }
    }
}

pub type ProjectServiceResult<T> = Result<T, ProjectServiceError>;

/// Days past the previous step's day searched for room before a step is
/// reported as unplaced.
pub const STEP_SCHEDULE_WINDOW_DAYS: u64 = 31;

/// Completed versus total active steps of one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectProgress {
    pub completed: usize,
    pub total: usize,
}

impl ProjectProgress {
    /// Whole percent, rounded half up; `0` for a project without steps.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let rounded = (self.completed * 200 + self.total) / (self.total * 2);
        u8::try_from(rounded).unwrap_or(100)
    }

    pub fn is_done(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// Outcome of laying a project's steps onto the calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepSchedule {
    /// Steps given a date, in step order.
    pub placed: Vec<TaskInstance>,
    /// Steps with no day inside the search window that fits the budget.
    pub unplaced: Vec<TaskInstance>,
}

/// Project service facade over project and task repositories.
pub struct ProjectService<P: ProjectRepository, T: TaskRepository> {
    projects: P,
    tasks: T,
}

impl<P: ProjectRepository, T: TaskRepository> ProjectService<P, T> {
    pub fn new(projects: P, tasks: T) -> Self {
        Self { projects, tasks }
    }

    /// Creates a project with the given status.
    pub fn create_project(
        &self,
        title: impl Into<String>,
        status: ProjectStatus,
    ) -> ProjectServiceResult<Project> {
        let mut project = Project::new(title.into().trim());
        project.status = status;
        self.projects.create_project(&project)?;
        Ok(project)
    }

    pub fn get_project(&self, id: ProjectId) -> ProjectServiceResult<Project> {
        self.projects
            .get_project(id)?
            .ok_or(ProjectServiceError::ProjectNotFound(id))
    }

    pub fn list_projects(
        &self,
        status: Option<ProjectStatus>,
    ) -> ProjectServiceResult<Vec<Project>> {
        Ok(self.projects.list_projects(status)?)
    }

    pub fn set_status(&self, id: ProjectId, status: ProjectStatus) -> ProjectServiceResult<()> {
        Ok(self.projects.set_project_status(id, status)?)
    }

    /// Unlinks every task from the project, then deletes the project row.
    ///
    /// Returns the number of unlinked tasks.
    pub fn delete_project(&self, id: ProjectId) -> ProjectServiceResult<usize> {
        self.get_project(id)?;
        let unlinked = RecurrenceService::new(&self.tasks).unlink_container(id)?;
        self.projects.delete_project(id)?;

        info!(
            "event=project_delete module=project status=ok project_id={} unlinked={}",
            id, unlinked
        );
        Ok(unlinked)
    }

    /// Active steps of a project in position order.
    pub fn list_steps(&self, id: ProjectId) -> ProjectServiceResult<Vec<TaskInstance>> {
        Ok(self
            .tasks
            .list_by_project(id)?
            .into_iter()
            .filter(TaskInstance::is_active)
            .collect())
    }

    /// Counts completed steps against all active steps.
    pub fn progress(&self, id: ProjectId) -> ProjectServiceResult<ProjectProgress> {
        self.get_project(id)?;
        let steps = self.list_steps(id)?;
        Ok(ProjectProgress {
            completed: steps.iter().filter(|step| step.is_completed).count(),
            total: steps.len(),
        })
    }

    /// Gives every open, unscheduled step the first day from `start` whose
    /// planned load stays within `budget_minutes` after adding the step.
    ///
    /// Steps are placed in order and a step never lands before the previous
    /// one. Completed and already scheduled steps are left alone.
    pub fn schedule_steps(
        &self,
        id: ProjectId,
        start: NaiveDate,
        budget_minutes: u32,
    ) -> ProjectServiceResult<StepSchedule> {
        self.get_project(id)?;
        let mut schedule = StepSchedule::default();
        let mut cursor = start;

        for step in self.list_steps(id)? {
            if step.is_completed || step.scheduled_date.is_some() {
                continue;
            }
            match self.first_day_with_room(&step, cursor, budget_minutes)? {
                Some(date) => {
                    let patch = TaskPatch {
                        scheduled_date: Some(Some(date)),
                        ..TaskPatch::default()
                    };
                    schedule.placed.push(self.tasks.update_fields(step.id, &patch)?);
                    cursor = date;
                }
                None => {
                    warn!(
                        "event=step_schedule module=project status=skip reason=no_room project_id={} task_id={} minutes={}",
                        id,
                        step.id,
                        step.planned_minutes()
                    );
                    schedule.unplaced.push(step);
                }
            }
        }

        info!(
            "event=step_schedule module=project status=ok project_id={} placed={} unplaced={}",
            id,
            schedule.placed.len(),
            schedule.unplaced.len()
        );
        Ok(schedule)
    }

    fn first_day_with_room(
        &self,
        step: &TaskInstance,
        from: NaiveDate,
        budget_minutes: u32,
    ) -> ProjectServiceResult<Option<NaiveDate>> {
        for offset in 0..STEP_SCHEDULE_WINDOW_DAYS {
            let Some(date) = from.checked_add_days(Days::new(offset)) else {
                break;
            };
            let existing = self.tasks.list_scheduled_on(date)?;
            let report = check_capacity(&existing, date, step.planned_minutes(), budget_minutes);
            if !report.exceeds {
                return Ok(Some(date));
            }
        }
        Ok(None)
    }

    /// Appends a task to the end of the project's step list.
    pub fn add_step(&self, id: ProjectId, draft: TaskDraft) -> ProjectServiceResult<TaskInstance> {
        self.get_project(id)?;
        let next_order = self
            .tasks
            .list_by_project(id)?
            .iter()
            .filter_map(|task| task.project_order)
            .max()
            .map_or(0, |order| order.saturating_add(1));

        let mut task = draft.into_instance();
        task.project_id = Some(id);
        task.project_order = Some(next_order);
        self.tasks.append(std::slice::from_ref(&task))?;
        Ok(task)
    }

    /// Copies a template's active steps into a new active project.
    ///
    /// Copies are unscheduled, not completed and keep the template's order.
    pub fn instantiate_template(
        &self,
        template_id: ProjectId,
        title: impl Into<String>,
    ) -> ProjectServiceResult<(Project, Vec<TaskInstance>)> {
        let template = self.get_project(template_id)?;
        if !template.is_template() {
            return Err(ProjectServiceError::NotTemplate(template_id));
        }

        let mut project = Project::new(title.into().trim());
        project.description = template.description.clone();
        project.color = template.color.clone();
        self.projects.create_project(&project)?;

        let steps: Vec<TaskInstance> = self
            .list_steps(template_id)?
            .into_iter()
            .map(|step| {
                let mut copy = TaskInstance::new(step.title);
                copy.estimated_minutes = step.estimated_minutes;
                copy.notes = step.notes;
                copy.tags = step.tags;
                copy.subtasks = step
                    .subtasks
                    .iter()
                    .map(|subtask| Subtask::new(subtask.title.clone()))
                    .collect();
                copy.project_id = Some(project.id);
                copy.project_order = step.project_order;
                copy
            })
            .collect();
        self.tasks.append(&steps)?;

        info!(
            "event=template_instantiate module=project status=ok template_id={} project_id={} steps={}",
            template_id,
            project.id,
            steps.len()
        );
        Ok((project, steps))
    }
}
