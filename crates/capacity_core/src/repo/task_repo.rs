//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the `list_all / append / update_fields` collaborator contract.
//! - Keep SQL details inside the planner persistence boundary.
//!
//! # Invariants
//! - Write paths call `TaskInstance::validate()` before SQL mutations.
//! - The `signature` column is derived from `(title, recurrence)` on every write.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::model::task::{ProjectId, TaskId, TaskInstance, TaskPatch};
use crate::repo::error::{RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    is_completed,
    created_at,
    scheduled_date,
    estimated_minutes,
    recurrence,
    series_id,
    series_anchor,
    project_id,
    project_order,
    notes,
    tags,
    subtasks,
    is_deleted
FROM tasks";

const TASK_ORDER_SQL: &str =
    "ORDER BY scheduled_date IS NULL, scheduled_date ASC, created_at ASC, id ASC";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Persistence contract for task instances.
///
/// `list_all`, `append` and `update_fields` are the only required methods;
/// the query helpers default to filtering `list_all` and may be overridden
/// by stores with indexed lookups.
pub trait TaskRepository {
    /// Returns every instance, tombstones included.
    fn list_all(&self) -> RepoResult<Vec<TaskInstance>>;

    /// Persists all `instances` or none of them.
    fn append(&self, instances: &[TaskInstance]) -> RepoResult<()>;

    /// Applies `patch` to one instance and returns the updated record.
    fn update_fields(&self, id: TaskId, patch: &TaskPatch) -> RepoResult<TaskInstance>;

    fn get_task(&self, id: TaskId) -> RepoResult<Option<TaskInstance>> {
        Ok(self.list_all()?.into_iter().find(|task| task.id == id))
    }

    /// Instances whose current signature equals `signature`, tombstones included.
    fn list_by_signature(&self, signature: &str) -> RepoResult<Vec<TaskInstance>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|task| task.signature().as_deref() == Some(signature))
            .collect())
    }

    /// Active instances scheduled on `date`.
    fn list_scheduled_on(&self, date: NaiveDate) -> RepoResult<Vec<TaskInstance>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|task| task.is_active_on(date))
            .collect())
    }

    /// Active instances without a scheduled date (the task pool).
    fn list_unscheduled(&self) -> RepoResult<Vec<TaskInstance>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|task| task.is_active() && task.scheduled_date.is_none())
            .collect())
    }

    /// Instances linked to `project_id` ordered by position, tombstones included.
    fn list_by_project(&self, project_id: ProjectId) -> RepoResult<Vec<TaskInstance>> {
        let mut tasks: Vec<TaskInstance> = self
            .list_all()?
            .into_iter()
            .filter(|task| task.project_id == Some(project_id))
            .collect();
        tasks.sort_by_key(|task| (task.project_order.is_none(), task.project_order, task.created_at));
        Ok(tasks)
    }

    /// Soft-deletes one instance. Idempotent.
    fn soft_delete_task(&self, id: TaskId) -> RepoResult<()> {
        let patch = TaskPatch {
            is_deleted: Some(true),
            ..TaskPatch::default()
        };
        self.update_fields(id, &patch).map(|_| ())
    }
}

impl<T: TaskRepository + ?Sized> TaskRepository for &T {
    fn list_all(&self) -> RepoResult<Vec<TaskInstance>> {
        (**self).list_all()
    }

    fn append(&self, instances: &[TaskInstance]) -> RepoResult<()> {
        (**self).append(instances)
    }

    fn update_fields(&self, id: TaskId, patch: &TaskPatch) -> RepoResult<TaskInstance> {
        (**self).update_fields(id, patch)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<TaskInstance>> {
        (**self).get_task(id)
    }

    fn list_by_signature(&self, signature: &str) -> RepoResult<Vec<TaskInstance>> {
        (**self).list_by_signature(signature)
    }

    fn list_scheduled_on(&self, date: NaiveDate) -> RepoResult<Vec<TaskInstance>> {
        (**self).list_scheduled_on(date)
    }

    fn list_unscheduled(&self) -> RepoResult<Vec<TaskInstance>> {
        (**self).list_unscheduled()
    }

    fn list_by_project(&self, project_id: ProjectId) -> RepoResult<Vec<TaskInstance>> {
        (**self).list_by_project(project_id)
    }

    fn soft_delete_task(&self, id: TaskId) -> RepoResult<()> {
        (**self).soft_delete_task(id)
    }
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_tasks(
        &self,
        where_sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<TaskInstance>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} {where_sql} {TASK_ORDER_SQL};"))?;
        let mut rows = stmt.query(params)?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn load_task(conn: &Connection, id: TaskId) -> RepoResult<Option<TaskInstance>> {
        let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn list_all(&self) -> RepoResult<Vec<TaskInstance>> {
        self.query_tasks("", [])
    }

    fn append(&self, instances: &[TaskInstance]) -> RepoResult<()> {
        if instances.is_empty() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tasks (
                    id,
                    title,
                    is_completed,
                    created_at,
                    scheduled_date,
                    estimated_minutes,
                    recurrence,
                    signature,
                    series_id,
                    series_anchor,
                    project_id,
                    project_order,
                    notes,
                    tags,
                    subtasks,
                    is_deleted
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16);",
            )?;
            for task in instances {
                task.validate()?;
                stmt.execute(params![
                    task.id.to_string(),
                    task.title.as_str(),
                    bool_to_int(task.is_completed),
                    task.created_at,
                    task.scheduled_date.map(format_date),
                    task.estimated_minutes,
                    encode_recurrence(task)?,
                    task.signature(),
                    task.series_id.map(|id| id.to_string()),
                    task.series_anchor.map(format_date),
                    task.project_id.map(|id| id.to_string()),
                    task.project_order,
                    task.notes.as_deref(),
                    serde_json::to_string(&task.tags)?,
                    serde_json::to_string(&task.subtasks)?,
                    bool_to_int(task.is_deleted),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn update_fields(&self, id: TaskId, patch: &TaskPatch) -> RepoResult<TaskInstance> {
        let tx = self.conn.unchecked_transaction()?;
        let mut task = Self::load_task(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        task.apply_patch(patch);
        task.validate()?;

        tx.execute(
            "UPDATE tasks
             SET
                title = ?2,
                is_completed = ?3,
                scheduled_date = ?4,
                estimated_minutes = ?5,
                recurrence = ?6,
                signature = ?7,
                series_id = ?8,
                series_anchor = ?9,
                project_id = ?10,
                project_order = ?11,
                notes = ?12,
                tags = ?13,
                subtasks = ?14,
                is_deleted = ?15,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                task.id.to_string(),
                task.title.as_str(),
                bool_to_int(task.is_completed),
                task.scheduled_date.map(format_date),
                task.estimated_minutes,
                encode_recurrence(&task)?,
                task.signature(),
                task.series_id.map(|id| id.to_string()),
                task.series_anchor.map(format_date),
                task.project_id.map(|id| id.to_string()),
                task.project_order,
                task.notes.as_deref(),
                serde_json::to_string(&task.tags)?,
                serde_json::to_string(&task.subtasks)?,
                bool_to_int(task.is_deleted),
            ],
        )?;
        tx.commit()?;

        Ok(task)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<TaskInstance>> {
        Self::load_task(self.conn, id)
    }

    fn list_by_signature(&self, signature: &str) -> RepoResult<Vec<TaskInstance>> {
        self.query_tasks("WHERE signature = ?1", [signature])
    }

    fn list_scheduled_on(&self, date: NaiveDate) -> RepoResult<Vec<TaskInstance>> {
        self.query_tasks(
            "WHERE scheduled_date = ?1 AND is_deleted = 0",
            [format_date(date)],
        )
    }

    fn list_unscheduled(&self) -> RepoResult<Vec<TaskInstance>> {
        self.query_tasks("WHERE scheduled_date IS NULL AND is_deleted = 0", [])
    }

    fn list_by_project(&self, project_id: ProjectId) -> RepoResult<Vec<TaskInstance>> {
        let mut tasks = self.query_tasks("WHERE project_id = ?1", [project_id.to_string()])?;
        tasks.sort_by_key(|task| (task.project_order.is_none(), task.project_order, task.created_at));
        Ok(tasks)
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<TaskInstance> {
    let id = parse_uuid_column(row.get("id")?, "tasks.id")?;

    let scheduled_date = parse_optional_date(row.get("scheduled_date")?, "tasks.scheduled_date")?;
    let series_anchor = parse_optional_date(row.get("series_anchor")?, "tasks.series_anchor")?;

    let estimated_minutes = match row.get::<_, Option<i64>>("estimated_minutes")? {
        Some(value) => Some(u32::try_from(value).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid estimate `{value}` in tasks.estimated_minutes"
            ))
        })?),
        None => None,
    };

    let project_order = match row.get::<_, Option<i64>>("project_order")? {
        Some(value) => Some(u32::try_from(value).map_err(|_| {
            RepoError::InvalidData(format!("invalid position `{value}` in tasks.project_order"))
        })?),
        None => None,
    };

    let recurrence = match row.get::<_, Option<String>>("recurrence")? {
        Some(value) => Some(serde_json::from_str(&value).map_err(|err| {
            RepoError::InvalidData(format!("invalid rule in tasks.recurrence: {err}"))
        })?),
        None => None,
    };

    let tags_text: String = row.get("tags")?;
    let tags = serde_json::from_str(&tags_text)
        .map_err(|err| RepoError::InvalidData(format!("invalid tags in tasks.tags: {err}")))?;

    let subtasks_text: String = row.get("subtasks")?;
    let subtasks = serde_json::from_str(&subtasks_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid checklist in tasks.subtasks: {err}"))
    })?;

    let task = TaskInstance {
        id,
        title: row.get("title")?,
        is_completed: int_to_bool(row.get("is_completed")?, "tasks.is_completed")?,
        created_at: row.get("created_at")?,
        scheduled_date,
        estimated_minutes,
        recurrence,
        series_id: parse_optional_uuid(row.get("series_id")?, "tasks.series_id")?,
        series_anchor,
        project_id: parse_optional_uuid(row.get("project_id")?, "tasks.project_id")?,
        project_order,
        notes: row.get("notes")?,
        tags,
        subtasks,
        is_deleted: int_to_bool(row.get("is_deleted")?, "tasks.is_deleted")?,
    };
    task.validate()?;
    Ok(task)
}

fn encode_recurrence(task: &TaskInstance) -> RepoResult<Option<String>> {
    match &task.recurrence {
        Some(rule) => Ok(Some(serde_json::to_string(rule)?)),
        None => Ok(None),
    }
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str, column: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

fn parse_optional_date(value: Option<String>, column: &str) -> RepoResult<Option<NaiveDate>> {
    value.map(|value| parse_date(&value, column)).transpose()
}

pub(crate) fn parse_uuid_column(value: String, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(&value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn parse_optional_uuid(value: Option<String>, column: &str) -> RepoResult<Option<Uuid>> {
    value.map(|value| parse_uuid_column(value, column)).transpose()
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
