//! Project repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `projects` and `project_categories`.
//! - Provide the single-column status update used by board moves.
//!
//! # Invariants
//! - Category order is preserved; position 0 is the primary category.
//! - Lists are ordered newest first: `created_at DESC, uuid ASC`.
//! - Delete is a tombstone; allocations on the project become orphaned.

use super::{
    bool_to_int, ensure_connection_ready, parse_flag, parse_uuid, RepoError, RepoResult,
    RequiredTable,
};
use crate::engine::capacity::MissingEntity;
use crate::model::project::{
    Project, ProjectCategory, ProjectId, ProjectPriority, ProjectStatus,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const PROJECT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    status,
    priority,
    start_date,
    end_date,
    is_deleted
FROM projects";

const REQUIRED_TABLES: &[RequiredTable] = &[
    (
        "projects",
        &[
            "uuid",
            "name",
            "description",
            "status",
            "priority",
            "start_date",
            "end_date",
            "is_deleted",
            "created_at",
            "updated_at",
        ],
    ),
    ("project_categories", &["project_uuid", "position", "category"]),
];

/// Query options for listing projects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectListQuery {
    pub status: Option<ProjectStatus>,
    /// Matches any of the project's categories, not only the primary one.
    pub category: Option<ProjectCategory>,
    pub include_deleted: bool,
}

/// Repository interface for project operations.
pub trait ProjectRepository {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId>;
    /// Replaces all mutable fields and categories of an active project.
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    fn set_status(&self, id: ProjectId, status: ProjectStatus) -> RepoResult<()>;
    fn get_project(&self, id: ProjectId, include_deleted: bool) -> RepoResult<Option<Project>>;
    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>>;
    fn soft_delete_project(&self, id: ProjectId) -> RepoResult<()>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId> {
        project.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO projects (
                uuid,
                name,
                description,
                status,
                priority,
                start_date,
                end_date,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                project.id.to_string(),
                project.name.as_str(),
                project.description.as_deref(),
                project.status.as_str(),
                project.priority.as_str(),
                project.start_date,
                project.end_date,
                bool_to_int(project.is_deleted),
            ],
        )?;
        write_categories(&tx, project)?;
        tx.commit()?;

        Ok(project.id)
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE projects
             SET
                name = ?2,
                description = ?3,
                status = ?4,
                priority = ?5,
                start_date = ?6,
                end_date = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            params![
                project.id.to_string(),
                project.name.as_str(),
                project.description.as_deref(),
                project.status.as_str(),
                project.priority.as_str(),
                project.start_date,
                project.end_date,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(MissingEntity::Project(project.id)));
        }

        write_categories(&tx, project)?;
        tx.commit()?;
        Ok(())
    }

    fn set_status(&self, id: ProjectId, status: ProjectStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects
             SET
                status = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            params![id.to_string(), status.as_str()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(MissingEntity::Project(id)));
        }
        Ok(())
    }

    fn get_project(&self, id: ProjectId, include_deleted: bool) -> RepoResult<Option<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(self.conn, row)?));
        }

        Ok(None)
    }

    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>> {
        let mut sql = format!("{PROJECT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }

        if let Some(category) = query.category {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM project_categories pc
                    WHERE pc.project_uuid = projects.uuid
                      AND pc.category = ?
                )",
            );
            bind_values.push(Value::Text(category.as_str().to_string()));
        }

        sql.push_str(" ORDER BY created_at DESC, uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(self.conn, row)?);
        }
        Ok(projects)
    }

    fn soft_delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects
             SET
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1 AND is_deleted = 0;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(MissingEntity::Project(id)));
        }
        Ok(())
    }
}

fn parse_project_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Project> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "projects.uuid")?;

    let status_text: String = row.get("status")?;
    let status = ProjectStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in projects.status"))
    })?;

    let priority_text: String = row.get("priority")?;
    let priority = ProjectPriority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in projects.priority"
        ))
    })?;

    let project = Project {
        id,
        name: row.get("name")?,
        description: row.get("description")?,
        status,
        priority,
        categories: load_categories(conn, &uuid_text)?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        is_deleted: parse_flag(row.get("is_deleted")?, "projects.is_deleted")?,
    };
    project.validate()?;
    Ok(project)
}

fn load_categories(conn: &Connection, project_uuid: &str) -> RepoResult<Vec<ProjectCategory>> {
    let mut stmt = conn.prepare(
        "SELECT category
         FROM project_categories
         WHERE project_uuid = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([project_uuid])?;
    let mut categories = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        let category = ProjectCategory::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid category `{value}` in project_categories.category"
            ))
        })?;
        categories.push(category);
    }
    Ok(categories)
}

fn write_categories(tx: &Transaction<'_>, project: &Project) -> RepoResult<()> {
    let project_uuid = project.id.to_string();
    tx.execute(
        "DELETE FROM project_categories WHERE project_uuid = ?1;",
        [project_uuid.as_str()],
    )?;
    for (position, category) in project.categories.iter().enumerate() {
        tx.execute(
            "INSERT INTO project_categories (project_uuid, position, category)
             VALUES (?1, ?2, ?3);",
            params![project_uuid.as_str(), position as i64, category.as_str()],
        )?;
    }
    Ok(())
}
