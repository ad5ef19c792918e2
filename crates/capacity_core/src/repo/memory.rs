//! In-memory task repository.
//!
//! Holds a single-writer snapshot of the collection. Useful for hosts that
//! own persistence themselves and hand the core a list of records, and for
//! exercising services without SQLite.

use crate::model::task::{TaskId, TaskInstance, TaskPatch};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::task_repo::TaskRepository;
use std::cell::RefCell;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    tasks: RefCell<Vec<TaskInstance>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the repository with an existing snapshot.
    ///
    /// # Errors
    /// - Returns validation errors for invalid records.
    /// - Returns `InvalidData` for duplicate ids.
    pub fn from_tasks(tasks: Vec<TaskInstance>) -> RepoResult<Self> {
        let repo = Self::new();
        repo.append(&tasks)?;
        Ok(repo)
    }

    /// Returns the current snapshot, insertion order preserved.
    pub fn snapshot(&self) -> Vec<TaskInstance> {
        self.tasks.borrow().clone()
    }
}

impl TaskRepository for InMemoryTaskRepository {
    fn list_all(&self) -> RepoResult<Vec<TaskInstance>> {
        Ok(self.snapshot())
    }

    fn append(&self, instances: &[TaskInstance]) -> RepoResult<()> {
        let mut tasks = self.tasks.borrow_mut();
        let mut seen: HashSet<TaskId> = tasks.iter().map(|task| task.id).collect();
        for task in instances {
            task.validate()?;
            if !seen.insert(task.id) {
                return Err(RepoError::InvalidData(format!(
                    "duplicate task id `{}`",
                    task.id
                )));
            }
        }
        tasks.extend_from_slice(instances);
        Ok(())
    }

    fn update_fields(&self, id: TaskId, patch: &TaskPatch) -> RepoResult<TaskInstance> {
        let mut tasks = self.tasks.borrow_mut();
        let slot = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(RepoError::NotFound(id))?;

        let mut updated = slot.clone();
        updated.apply_patch(patch);
        updated.validate()?;
        *slot = updated.clone();
        Ok(updated)
    }
}
