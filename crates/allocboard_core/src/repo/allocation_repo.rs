//! Allocation repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist developer-to-project hour allocations.
//! - Run the capacity check and the write as one atomic operation.
//! - Build developer snapshots for the capacity engine.
//!
//! # Invariants
//! - Create/update run inside `BEGIN IMMEDIATE`: the snapshot read, the
//!   engine decision and the write see the same committed state.
//! - `UNIQUE(developer_uuid, project_uuid)` backs the duplicate check.
//! - Allocations on tombstoned projects/developers are reported as orphaned
//!   and never counted toward capacity.

use super::developer_repo::parse_developer_row;
use super::{
    ensure_connection_ready, parse_hours, parse_uuid, RepoError, RepoResult,
    RequiredTable,
};
use crate::engine::capacity::{
    validate_allocation_request, AllocationError, CapacityCheck, Commitment, DeveloperSnapshot,
    MissingEntity,
};
use crate::model::allocation::{Allocation, AllocationId, AllocationRecord};
use crate::model::developer::{Developer, DeveloperId};
use crate::model::project::ProjectId;
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const ALLOCATION_SELECT_SQL: &str = "SELECT
    a.uuid,
    a.developer_uuid,
    a.project_uuid,
    a.hours_allocated,
    a.hours_worked,
    a.allocation_percentage,
    a.start_date,
    a.end_date,
    d.name AS developer_name,
    d.is_deleted AS developer_deleted,
    p.name AS project_name,
    p.is_deleted AS project_deleted
FROM allocations a
LEFT JOIN developers d ON d.uuid = a.developer_uuid
LEFT JOIN projects p ON p.uuid = a.project_uuid";

const REQUIRED_TABLES: &[RequiredTable] = &[
    (
        "allocations",
        &[
            "uuid",
            "developer_uuid",
            "project_uuid",
            "hours_allocated",
            "hours_worked",
            "allocation_percentage",
            "start_date",
            "end_date",
            "created_at",
            "updated_at",
        ],
    ),
    ("developers", &["uuid", "name", "is_deleted"]),
    ("projects", &["uuid", "name", "is_deleted"]),
];

/// Write model for a new assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationDraft {
    pub developer_id: DeveloperId,
    pub project_id: ProjectId,
    /// Raw requested hours; non-positive values are rejected by the engine.
    pub hours_allocated: i64,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}

/// Write model for editing an existing assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationUpdate {
    pub hours_allocated: i64,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}

/// Query options for listing allocations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationListQuery {
    pub developer_id: Option<DeveloperId>,
    pub project_id: Option<ProjectId>,
    pub include_orphaned: bool,
}

/// Repository interface for allocation operations.
pub trait AllocationRepository {
    /// Atomically checks duplicates and capacity, then inserts.
    fn create_allocation(&self, draft: &AllocationDraft) -> RepoResult<AllocationRecord>;
    /// Atomically re-checks capacity excluding `id`, then updates hours,
    /// derived percentage and dates.
    fn update_allocation(
        &self,
        id: AllocationId,
        update: &AllocationUpdate,
    ) -> RepoResult<AllocationRecord>;
    fn set_hours_worked(&self, id: AllocationId, hours_worked: u32) -> RepoResult<()>;
    fn delete_allocation(&self, id: AllocationId) -> RepoResult<()>;
    fn get_allocation(&self, id: AllocationId) -> RepoResult<Option<AllocationRecord>>;
    fn list_allocations(&self, query: &AllocationListQuery) -> RepoResult<Vec<AllocationRecord>>;
    /// Active developer plus every allocation pointing at them.
    fn developer_snapshot(&self, id: DeveloperId) -> RepoResult<Option<DeveloperSnapshot>>;
    /// Snapshots for every active developer, ordered by name.
    fn developer_snapshots(&self) -> RepoResult<Vec<DeveloperSnapshot>>;
    fn project_exists(&self, id: ProjectId) -> RepoResult<bool>;
}

/// SQLite-backed allocation repository.
pub struct SqliteAllocationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAllocationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl AllocationRepository for SqliteAllocationRepository<'_> {
    fn create_allocation(&self, draft: &AllocationDraft) -> RepoResult<AllocationRecord> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let snapshot = load_snapshot(&tx, draft.developer_id)?.ok_or(RepoError::Rejected(
            AllocationError::NotFound(MissingEntity::Developer(draft.developer_id)),
        ))?;
        if !project_is_active(&tx, draft.project_id)? {
            return Err(AllocationError::NotFound(MissingEntity::Project(draft.project_id)).into());
        }
        if snapshot
            .commitments
            .iter()
            .any(|commitment| !commitment.orphaned && commitment.project_id == draft.project_id)
        {
            return Err(AllocationError::DuplicateAssignment {
                developer_id: draft.developer_id,
                project_id: draft.project_id,
            }
            .into());
        }

        let check = validate_allocation_request(
            &snapshot.developer,
            &snapshot.commitments,
            draft.hours_allocated,
            None,
        )?;

        let mut allocation = Allocation::new(
            draft.developer_id,
            draft.project_id,
            check.requested_hours,
            check.allocation_percentage,
        );
        allocation.start_date = draft.start_date;
        allocation.end_date = draft.end_date;
        allocation.validate()?;

        tx.execute(
            "INSERT INTO allocations (
                uuid,
                developer_uuid,
                project_uuid,
                hours_allocated,
                hours_worked,
                allocation_percentage,
                start_date,
                end_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                allocation.id.to_string(),
                allocation.developer_id.to_string(),
                allocation.project_id.to_string(),
                allocation.hours_allocated,
                allocation.hours_worked,
                allocation.allocation_percentage,
                allocation.start_date,
                allocation.end_date,
            ],
        )?;

        let record = get_record(&tx, allocation.id)?.ok_or_else(|| {
            RepoError::InvalidData("created allocation not found in read-back".to_string())
        })?;
        tx.commit()?;

        log_capacity_check("allocation_create", &check);
        Ok(record)
    }

    fn update_allocation(
        &self,
        id: AllocationId,
        update: &AllocationUpdate,
    ) -> RepoResult<AllocationRecord> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let existing = get_record(&tx, id)?
            .ok_or(RepoError::NotFound(MissingEntity::Allocation(id)))?;
        let developer_id = existing.allocation.developer_id;
        let snapshot = load_snapshot(&tx, developer_id)?.ok_or(RepoError::Rejected(
            AllocationError::NotFound(MissingEntity::Developer(developer_id)),
        ))?;
        if !project_is_active(&tx, existing.allocation.project_id)? {
            return Err(AllocationError::NotFound(MissingEntity::Project(
                existing.allocation.project_id,
            ))
            .into());
        }

        let check = validate_allocation_request(
            &snapshot.developer,
            &snapshot.commitments,
            update.hours_allocated,
            Some(id),
        )?;

        let mut allocation = existing.allocation;
        allocation.hours_allocated = check.requested_hours;
        allocation.allocation_percentage = check.allocation_percentage;
        allocation.start_date = update.start_date;
        allocation.end_date = update.end_date;
        allocation.validate()?;

        tx.execute(
            "UPDATE allocations
             SET
                hours_allocated = ?2,
                allocation_percentage = ?3,
                start_date = ?4,
                end_date = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                id.to_string(),
                allocation.hours_allocated,
                allocation.allocation_percentage,
                allocation.start_date,
                allocation.end_date,
            ],
        )?;

        let record = get_record(&tx, id)?.ok_or_else(|| {
            RepoError::InvalidData("updated allocation not found in read-back".to_string())
        })?;
        tx.commit()?;

        log_capacity_check("allocation_update", &check);
        Ok(record)
    }

    fn set_hours_worked(&self, id: AllocationId, hours_worked: u32) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE allocations
             SET
                hours_worked = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), hours_worked],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(MissingEntity::Allocation(id)));
        }
        Ok(())
    }

    fn delete_allocation(&self, id: AllocationId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM allocations WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(MissingEntity::Allocation(id)));
        }
        Ok(())
    }

    fn get_allocation(&self, id: AllocationId) -> RepoResult<Option<AllocationRecord>> {
        get_record(self.conn, id)
    }

    fn list_allocations(&self, query: &AllocationListQuery) -> RepoResult<Vec<AllocationRecord>> {
        let mut sql = format!("{ALLOCATION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(developer_id) = query.developer_id {
            sql.push_str(" AND a.developer_uuid = ?");
            bind_values.push(Value::Text(developer_id.to_string()));
        }
        if let Some(project_id) = query.project_id {
            sql.push_str(" AND a.project_uuid = ?");
            bind_values.push(Value::Text(project_id.to_string()));
        }
        if !query.include_orphaned {
            sql.push_str(" AND d.is_deleted = 0 AND p.is_deleted = 0");
        }

        sql.push_str(" ORDER BY a.created_at ASC, a.uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }

    fn developer_snapshot(&self, id: DeveloperId) -> RepoResult<Option<DeveloperSnapshot>> {
        load_snapshot(self.conn, id)
    }

    fn developer_snapshots(&self) -> RepoResult<Vec<DeveloperSnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                uuid,
                name,
                email,
                weekly_capacity_hours,
                is_available,
                is_deleted
             FROM developers
             WHERE is_deleted = 0
             ORDER BY name COLLATE NOCASE ASC, uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut developers: Vec<Developer> = Vec::new();
        while let Some(row) = rows.next()? {
            developers.push(parse_developer_row(self.conn, row)?);
        }

        developers
            .into_iter()
            .map(|developer| {
                let commitments = load_commitments(self.conn, developer.id)?;
                Ok(DeveloperSnapshot {
                    developer,
                    commitments,
                })
            })
            .collect()
    }

    fn project_exists(&self, id: ProjectId) -> RepoResult<bool> {
        project_is_active(self.conn, id)
    }
}

fn load_snapshot(conn: &Connection, id: DeveloperId) -> RepoResult<Option<DeveloperSnapshot>> {
    let mut stmt = conn.prepare(
        "SELECT
            uuid,
            name,
            email,
            weekly_capacity_hours,
            is_available,
            is_deleted
         FROM developers
         WHERE uuid = ?1
           AND is_deleted = 0;",
    )?;
    let mut rows = stmt.query([id.to_string()])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let developer = parse_developer_row(conn, row)?;
    let commitments = load_commitments(conn, developer.id)?;

    Ok(Some(DeveloperSnapshot {
        developer,
        commitments,
    }))
}

fn load_commitments(conn: &Connection, developer_id: DeveloperId) -> RepoResult<Vec<Commitment>> {
    let mut stmt = conn.prepare(&format!(
        "{ALLOCATION_SELECT_SQL}
         WHERE a.developer_uuid = ?1
         ORDER BY a.created_at ASC, a.uuid ASC;"
    ))?;
    let mut rows = stmt.query([developer_id.to_string()])?;
    let mut commitments = Vec::new();
    while let Some(row) = rows.next()? {
        commitments.push(Commitment::from(&parse_record_row(row)?));
    }
    Ok(commitments)
}

fn project_is_active(conn: &Connection, id: ProjectId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM projects
            WHERE uuid = ?1
              AND is_deleted = 0
        );",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn get_record(conn: &Connection, id: AllocationId) -> RepoResult<Option<AllocationRecord>> {
    let mut stmt = conn.prepare(&format!("{ALLOCATION_SELECT_SQL} WHERE a.uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_record_row(row)?));
    }
    Ok(None)
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<AllocationRecord> {
    let uuid_text: String = row.get("uuid")?;
    let developer_text: String = row.get("developer_uuid")?;
    let project_text: String = row.get("project_uuid")?;

    let allocation = Allocation {
        id: parse_uuid(&uuid_text, "allocations.uuid")?,
        developer_id: parse_uuid(&developer_text, "allocations.developer_uuid")?,
        project_id: parse_uuid(&project_text, "allocations.project_uuid")?,
        hours_allocated: parse_hours(row.get("hours_allocated")?, "allocations.hours_allocated")?,
        hours_worked: parse_hours(row.get("hours_worked")?, "allocations.hours_worked")?,
        allocation_percentage: row.get("allocation_percentage")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
    };
    allocation.validate()?;

    // A missing join row and a tombstone both mean "no longer resolves".
    let developer_live = row.get::<_, Option<i64>>("developer_deleted")? == Some(0);
    let project_live = row.get::<_, Option<i64>>("project_deleted")? == Some(0);
    let developer_name: Option<String> = row.get("developer_name")?;
    let project_name: Option<String> = row.get("project_name")?;

    Ok(AllocationRecord {
        allocation,
        developer_name: developer_name.filter(|_| developer_live),
        project_name: project_name.filter(|_| project_live),
        orphaned: !(developer_live && project_live),
    })
}

fn log_capacity_check(event: &str, check: &CapacityCheck) {
    debug!(
        "event={event} module=repo status=ok requested_hours={} available_hours={} committed_hours={} exact_fill={}",
        check.requested_hours,
        check.available_hours,
        check.committed_hours,
        i64::from(check.requested_hours) == check.available_hours
    );
}
