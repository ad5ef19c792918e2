//! Project repository contract and SQLite implementation.
//!
//! # Invariants
//! - Deleting a project still referenced by tasks fails on the foreign key;
//!   callers unlink tasks first.

use crate::model::project::{Project, ProjectStatus};
use crate::model::task::ProjectId;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::task_repo::parse_uuid_column;
use rusqlite::{params, Connection, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    color,
    status,
    created_at
FROM projects";

/// Repository interface for project (task container) records.
pub trait ProjectRepository {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Lists projects, optionally filtered by status, oldest first.
    fn list_projects(&self, status: Option<ProjectStatus>) -> RepoResult<Vec<Project>>;
    fn set_project_status(&self, id: ProjectId, status: ProjectStatus) -> RepoResult<()>;
    /// Hard-deletes the project row only.
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId> {
        project.validate()?;

        self.conn.execute(
            "INSERT INTO projects (
                id,
                title,
                description,
                color,
                status,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                project.id.to_string(),
                project.title.as_str(),
                project.description.as_deref(),
                project.color.as_deref(),
                project.status.as_str(),
                project.created_at,
            ],
        )?;

        Ok(project.id)
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn list_projects(&self, status: Option<ProjectStatus>) -> RepoResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE (?1 IS NULL OR status = ?1)
             ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([status.map(ProjectStatus::as_str)])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn set_project_status(&self, id: ProjectId, status: ProjectStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects SET status = ?2 WHERE id = ?1;",
            params![id.to_string(), status.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let status_text: String = row.get("status")?;
    let status = ProjectStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid project status `{status_text}` in projects.status"
        ))
    })?;

    let project = Project {
        id: parse_uuid_column(row.get("id")?, "projects.id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        color: row.get("color")?,
        status,
        created_at: row.get("created_at")?,
    };
    project.validate()?;
    Ok(project)
}
