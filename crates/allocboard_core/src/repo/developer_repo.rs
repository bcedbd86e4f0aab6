//! Developer repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `developers` and `developer_skills`.
//! - Keep derived allocation percentages consistent with capacity changes.
//!
//! # Invariants
//! - Capacity updates recompute `allocation_percentage` for every allocation
//!   of the developer in the same transaction.
//! - Skill order is preserved as written.
//! - Delete is a tombstone; allocations are left in place and become orphaned.

use super::{
    bool_to_int, ensure_connection_ready, parse_flag, parse_hours, parse_uuid, RepoError,
    RepoResult, RequiredTable,
};
use crate::engine::capacity::{compute_allocation_percentage, MissingEntity};
use crate::model::developer::{Developer, DeveloperId};
use log::debug;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const DEVELOPER_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    email,
    weekly_capacity_hours,
    is_available,
    is_deleted
FROM developers";

const REQUIRED_TABLES: &[RequiredTable] = &[
    (
        "developers",
        &[
            "uuid",
            "name",
            "email",
            "weekly_capacity_hours",
            "is_available",
            "is_deleted",
            "updated_at",
        ],
    ),
    ("developer_skills", &["developer_uuid", "position", "skill"]),
];

/// Repository interface for developer operations.
pub trait DeveloperRepository {
    fn create_developer(&self, developer: &Developer) -> RepoResult<DeveloperId>;
    /// Replaces all mutable fields and skills of an active developer.
    fn update_developer(&self, developer: &Developer) -> RepoResult<()>;
    fn get_developer(&self, id: DeveloperId, include_deleted: bool)
        -> RepoResult<Option<Developer>>;
    /// Lists developers ordered by name (case-insensitive), then id.
    fn list_developers(&self, include_deleted: bool) -> RepoResult<Vec<Developer>>;
    fn soft_delete_developer(&self, id: DeveloperId) -> RepoResult<()>;
}

/// SQLite-backed developer repository.
pub struct SqliteDeveloperRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDeveloperRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl DeveloperRepository for SqliteDeveloperRepository<'_> {
    fn create_developer(&self, developer: &Developer) -> RepoResult<DeveloperId> {
        developer.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO developers (
                uuid,
                name,
                email,
                weekly_capacity_hours,
                is_available,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                developer.id.to_string(),
                developer.name.as_str(),
                developer.email.as_str(),
                developer.weekly_capacity_hours,
                bool_to_int(developer.is_available),
                bool_to_int(developer.is_deleted),
            ],
        )?;
        write_skills(&tx, developer)?;
        tx.commit()?;

        Ok(developer.id)
    }

    fn update_developer(&self, developer: &Developer) -> RepoResult<()> {
        developer.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE developers
             SET
                name = ?2,
                email = ?3,
                weekly_capacity_hours = ?4,
                is_available = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            params![
                developer.id.to_string(),
                developer.name.as_str(),
                developer.email.as_str(),
                developer.weekly_capacity_hours,
                bool_to_int(developer.is_available),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(MissingEntity::Developer(developer.id)));
        }

        write_skills(&tx, developer)?;
        let recomputed = recompute_allocation_percentages(&tx, developer)?;
        tx.commit()?;

        debug!(
            "event=developer_update module=repo status=ok recomputed_allocations={recomputed}"
        );
        Ok(())
    }

    fn get_developer(
        &self,
        id: DeveloperId,
        include_deleted: bool,
    ) -> RepoResult<Option<Developer>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DEVELOPER_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_developer_row(self.conn, row)?));
        }

        Ok(None)
    }

    fn list_developers(&self, include_deleted: bool) -> RepoResult<Vec<Developer>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DEVELOPER_SELECT_SQL}
             WHERE (?1 = 1 OR is_deleted = 0)
             ORDER BY name COLLATE NOCASE ASC, uuid ASC;"
        ))?;

        let mut rows = stmt.query([bool_to_int(include_deleted)])?;
        let mut developers = Vec::new();
        while let Some(row) = rows.next()? {
            developers.push(parse_developer_row(self.conn, row)?);
        }
        Ok(developers)
    }

    fn soft_delete_developer(&self, id: DeveloperId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE developers
             SET
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1 AND is_deleted = 0;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(MissingEntity::Developer(id)));
        }

        Ok(())
    }
}

pub(crate) fn parse_developer_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Developer> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "developers.uuid")?;

    let weekly_capacity_hours = match row.get::<_, Option<i64>>("weekly_capacity_hours")? {
        Some(value) => Some(parse_hours(value, "developers.weekly_capacity_hours")?),
        None => None,
    };

    let developer = Developer {
        id,
        name: row.get("name")?,
        email: row.get("email")?,
        skills: load_skills(conn, &uuid_text)?,
        weekly_capacity_hours,
        is_available: parse_flag(row.get("is_available")?, "developers.is_available")?,
        is_deleted: parse_flag(row.get("is_deleted")?, "developers.is_deleted")?,
    };
    developer.validate()?;
    Ok(developer)
}

fn load_skills(conn: &Connection, developer_uuid: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT skill
         FROM developer_skills
         WHERE developer_uuid = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([developer_uuid])?;
    let mut skills = Vec::new();
    while let Some(row) = rows.next()? {
        skills.push(row.get(0)?);
    }
    Ok(skills)
}

fn write_skills(tx: &Transaction<'_>, developer: &Developer) -> RepoResult<()> {
    let developer_uuid = developer.id.to_string();
    tx.execute(
        "DELETE FROM developer_skills WHERE developer_uuid = ?1;",
        [developer_uuid.as_str()],
    )?;
    for (position, skill) in developer.skills.iter().enumerate() {
        tx.execute(
            "INSERT INTO developer_skills (developer_uuid, position, skill)
             VALUES (?1, ?2, ?3);",
            params![developer_uuid.as_str(), position as i64, skill.as_str()],
        )?;
    }
    Ok(())
}

fn recompute_allocation_percentages(
    tx: &Transaction<'_>,
    developer: &Developer,
) -> RepoResult<usize> {
    let capacity = i64::from(developer.effective_capacity_hours());
    let mut stmt = tx.prepare(
        "SELECT uuid, hours_allocated
         FROM allocations
         WHERE developer_uuid = ?1;",
    )?;
    let mut rows = stmt.query([developer.id.to_string()])?;
    let mut updates = Vec::new();
    while let Some(row) = rows.next()? {
        let allocation_uuid: String = row.get(0)?;
        let hours = parse_hours(row.get(1)?, "allocations.hours_allocated")?;
        updates.push((allocation_uuid, compute_allocation_percentage(hours, capacity)));
    }
    drop(rows);
    drop(stmt);

    for (allocation_uuid, percentage) in &updates {
        tx.execute(
            "UPDATE allocations
             SET
                allocation_percentage = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![allocation_uuid.as_str(), percentage],
        )?;
    }
    Ok(updates.len())
}
