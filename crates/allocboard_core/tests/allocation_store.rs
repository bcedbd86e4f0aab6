use allocboard_core::db::{open_db, open_db_in_memory};
use allocboard_core::{
    AllocationDraft, AllocationError, AllocationListQuery, AllocationRepository,
    AllocationUpdate, Developer, DeveloperRepository, MissingEntity, Project, ProjectCategory,
    ProjectRepository, RepoError, SqliteAllocationRepository, SqliteDeveloperRepository,
    SqliteProjectRepository,
};
use rusqlite::Connection;
use std::time::Duration;
use uuid::Uuid;

fn developer(conn: &Connection, name: &str, capacity: Option<u32>) -> Developer {
    let repo = SqliteDeveloperRepository::try_new(conn).unwrap();
    let mut developer = Developer::new(name, format!("{}@company.com", name.to_lowercase()));
    developer.weekly_capacity_hours = capacity;
    developer.skills = vec!["General".to_string()];
    repo.create_developer(&developer).unwrap();
    developer
}

fn project(conn: &Connection, name: &str) -> Project {
    let repo = SqliteProjectRepository::try_new(conn).unwrap();
    let project = Project::new(name, vec![ProjectCategory::Web]);
    repo.create_project(&project).unwrap();
    project
}

fn draft(developer: &Developer, project: &Project, hours: i64) -> AllocationDraft {
    AllocationDraft {
        developer_id: developer.id,
        project_id: project.id,
        hours_allocated: hours,
        start_date: None,
        end_date: None,
    }
}

fn rejection(err: RepoError) -> AllocationError {
    match err {
        RepoError::Rejected(rejection) => rejection,
        RepoError::NotFound(missing) => AllocationError::NotFound(missing),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn full_capacity_assignment_is_persisted_at_hundred_percent() {
    let conn = open_db_in_memory().unwrap();
    let ada = developer(&conn, "Ada", Some(40));
    let portal = project(&conn, "Portal");
    let repo = SqliteAllocationRepository::try_new(&conn).unwrap();

    let record = repo.create_allocation(&draft(&ada, &portal, 40)).unwrap();
    assert_eq!(record.allocation.hours_allocated, 40);
    assert_eq!(record.allocation.allocation_percentage, 100.0);
    assert_eq!(record.allocation.hours_worked, 0);
    assert_eq!(record.developer_name.as_deref(), Some("Ada"));
    assert_eq!(record.project_name.as_deref(), Some("Portal"));
    assert!(!record.orphaned);

    let loaded = repo.get_allocation(record.allocation.id).unwrap().unwrap();
    assert_eq!(loaded, record);
}

#[test]
fn over_capacity_request_is_rejected_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let ada = developer(&conn, "Ada", Some(40));
    let x = project(&conn, "X");
    let y = project(&conn, "Y");
    let repo = SqliteAllocationRepository::try_new(&conn).unwrap();
    repo.create_allocation(&draft(&ada, &x, 30)).unwrap();

    let err = repo.create_allocation(&draft(&ada, &y, 15)).unwrap_err();
    assert_eq!(
        rejection(err),
        AllocationError::CapacityExceeded {
            requested: 15,
            available: 10,
            committed: 30,
        }
    );

    let rows = repo
        .list_allocations(&AllocationListQuery::default())
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn duplicate_assignment_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let ada = developer(&conn, "Ada", Some(40));
    let portal = project(&conn, "Portal");
    let repo = SqliteAllocationRepository::try_new(&conn).unwrap();
    repo.create_allocation(&draft(&ada, &portal, 5)).unwrap();

    let err = repo.create_allocation(&draft(&ada, &portal, 5)).unwrap_err();
    assert_eq!(
        rejection(err),
        AllocationError::DuplicateAssignment {
            developer_id: ada.id,
            project_id: portal.id,
        }
    );
}

#[test]
fn unknown_developer_and_project_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let ada = developer(&conn, "Ada", Some(40));
    let portal = project(&conn, "Portal");
    let repo = SqliteAllocationRepository::try_new(&conn).unwrap();

    let ghost = Uuid::new_v4();
    let mut request = draft(&ada, &portal, 5);
    request.developer_id = ghost;
    assert_eq!(
        rejection(repo.create_allocation(&request).unwrap_err()),
        AllocationError::NotFound(MissingEntity::Developer(ghost))
    );

    let mut request = draft(&ada, &portal, 5);
    request.project_id = ghost;
    assert_eq!(
        rejection(repo.create_allocation(&request).unwrap_err()),
        AllocationError::NotFound(MissingEntity::Project(ghost))
    );
}

#[test]
fn edit_excludes_its_own_hours() {
    let conn = open_db_in_memory().unwrap();
    let ada = developer(&conn, "Ada", Some(40));
    let x = project(&conn, "X");
    let repo = SqliteAllocationRepository::try_new(&conn).unwrap();
    let record = repo.create_allocation(&draft(&ada, &x, 30)).unwrap();

    let updated = repo
        .update_allocation(
            record.allocation.id,
            &AllocationUpdate {
                hours_allocated: 35,
                start_date: Some(1_000),
                end_date: Some(2_000),
            },
        )
        .unwrap();
    assert_eq!(updated.allocation.hours_allocated, 35);
    assert_eq!(updated.allocation.allocation_percentage, 87.5);
    assert_eq!(updated.allocation.start_date, Some(1_000));

    let err = repo
        .update_allocation(
            record.allocation.id,
            &AllocationUpdate {
                hours_allocated: 41,
                start_date: None,
                end_date: None,
            },
        )
        .unwrap_err();
    assert!(matches!(
        rejection(err),
        AllocationError::CapacityExceeded { available: 40, .. }
    ));
}

#[test]
fn editing_a_missing_allocation_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAllocationRepository::try_new(&conn).unwrap();
    let ghost = Uuid::new_v4();

    let err = repo
        .update_allocation(
            ghost,
            &AllocationUpdate {
                hours_allocated: 5,
                start_date: None,
                end_date: None,
            },
        )
        .unwrap_err();
    assert_eq!(
        rejection(err),
        AllocationError::NotFound(MissingEntity::Allocation(ghost))
    );
}

#[test]
fn tombstoned_project_orphans_its_allocations_and_frees_capacity() {
    let conn = open_db_in_memory().unwrap();
    let ada = developer(&conn, "Ada", Some(40));
    let x = project(&conn, "X");
    let y = project(&conn, "Y");
    let repo = SqliteAllocationRepository::try_new(&conn).unwrap();
    let orphan = repo.create_allocation(&draft(&ada, &x, 30)).unwrap();

    SqliteProjectRepository::try_new(&conn)
        .unwrap()
        .soft_delete_project(x.id)
        .unwrap();

    let accepted = repo.create_allocation(&draft(&ada, &y, 40)).unwrap();
    assert_eq!(accepted.allocation.allocation_percentage, 100.0);

    let live = repo
        .list_allocations(&AllocationListQuery::default())
        .unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].allocation.id, accepted.allocation.id);

    let everything = repo
        .list_allocations(&AllocationListQuery {
            include_orphaned: true,
            ..AllocationListQuery::default()
        })
        .unwrap();
    assert_eq!(everything.len(), 2);
    let stale = everything
        .iter()
        .find(|record| record.allocation.id == orphan.allocation.id)
        .unwrap();
    assert!(stale.orphaned);
    assert_eq!(stale.project_name, None);
    assert_eq!(stale.developer_name.as_deref(), Some("Ada"));
}

#[test]
fn capacity_change_recomputes_percentages() {
    let conn = open_db_in_memory().unwrap();
    let mut ada = developer(&conn, "Ada", Some(40));
    let x = project(&conn, "X");
    let repo = SqliteAllocationRepository::try_new(&conn).unwrap();
    let record = repo.create_allocation(&draft(&ada, &x, 20)).unwrap();
    assert_eq!(record.allocation.allocation_percentage, 50.0);

    ada.weekly_capacity_hours = Some(20);
    SqliteDeveloperRepository::try_new(&conn)
        .unwrap()
        .update_developer(&ada)
        .unwrap();

    let loaded = repo.get_allocation(record.allocation.id).unwrap().unwrap();
    assert_eq!(loaded.allocation.allocation_percentage, 100.0);
}

#[test]
fn unset_capacity_uses_default_forty_hours() {
    let conn = open_db_in_memory().unwrap();
    let ada = developer(&conn, "Ada", None);
    let x = project(&conn, "X");
    let repo = SqliteAllocationRepository::try_new(&conn).unwrap();

    let record = repo.create_allocation(&draft(&ada, &x, 10)).unwrap();
    assert_eq!(record.allocation.allocation_percentage, 25.0);

    let snapshot = repo.developer_snapshot(ada.id).unwrap().unwrap();
    assert_eq!(snapshot.developer.effective_capacity_hours(), 40);
    assert_eq!(snapshot.commitments.len(), 1);
}

#[test]
fn list_filters_and_orders_by_creation() {
    let conn = open_db_in_memory().unwrap();
    let ada = developer(&conn, "Ada", Some(40));
    let bo = developer(&conn, "Bo", Some(40));
    let x = project(&conn, "X");
    let y = project(&conn, "Y");
    let repo = SqliteAllocationRepository::try_new(&conn).unwrap();

    let first = repo.create_allocation(&draft(&bo, &x, 5)).unwrap();
    let second = repo.create_allocation(&draft(&ada, &x, 5)).unwrap();
    let third = repo.create_allocation(&draft(&ada, &y, 5)).unwrap();
    set_created_at(&conn, first.allocation.id, 1_000);
    set_created_at(&conn, second.allocation.id, 2_000);
    set_created_at(&conn, third.allocation.id, 3_000);

    let on_x: Vec<Uuid> = repo
        .list_allocations(&AllocationListQuery {
            project_id: Some(x.id),
            ..AllocationListQuery::default()
        })
        .unwrap()
        .into_iter()
        .map(|record| record.allocation.id)
        .collect();
    assert_eq!(on_x, vec![first.allocation.id, second.allocation.id]);

    let for_ada = repo
        .list_allocations(&AllocationListQuery {
            developer_id: Some(ada.id),
            ..AllocationListQuery::default()
        })
        .unwrap();
    assert_eq!(for_ada.len(), 2);
    assert_eq!(for_ada[1].allocation.id, third.allocation.id);
}

#[test]
fn unassign_removes_the_row_and_allows_reassignment() {
    let conn = open_db_in_memory().unwrap();
    let ada = developer(&conn, "Ada", Some(40));
    let x = project(&conn, "X");
    let repo = SqliteAllocationRepository::try_new(&conn).unwrap();
    let record = repo.create_allocation(&draft(&ada, &x, 40)).unwrap();

    repo.delete_allocation(record.allocation.id).unwrap();
    assert!(repo.get_allocation(record.allocation.id).unwrap().is_none());
    assert!(matches!(
        repo.delete_allocation(record.allocation.id),
        Err(RepoError::NotFound(MissingEntity::Allocation(_)))
    ));

    repo.create_allocation(&draft(&ada, &x, 40)).unwrap();
}

#[test]
fn hours_worked_are_tracked_independently() {
    let conn = open_db_in_memory().unwrap();
    let ada = developer(&conn, "Ada", Some(40));
    let x = project(&conn, "X");
    let repo = SqliteAllocationRepository::try_new(&conn).unwrap();
    let record = repo.create_allocation(&draft(&ada, &x, 10)).unwrap();

    repo.set_hours_worked(record.allocation.id, 55).unwrap();
    let loaded = repo.get_allocation(record.allocation.id).unwrap().unwrap();
    assert_eq!(loaded.allocation.hours_worked, 55);
    assert_eq!(loaded.allocation.hours_allocated, 10);
}

#[test]
fn second_connection_sees_committed_hours_inside_its_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("allocboard.db");
    let conn_a = open_db(&path).unwrap();
    let conn_b = open_db(&path).unwrap();

    let ada = developer(&conn_a, "Ada", Some(40));
    let x = project(&conn_a, "X");
    let y = project(&conn_a, "Y");

    // Both sides are primed before A commits, like two open edit forms.
    let repo_a = SqliteAllocationRepository::try_new(&conn_a).unwrap();
    let repo_b = SqliteAllocationRepository::try_new(&conn_b).unwrap();
    assert_eq!(repo_b.developer_snapshot(ada.id).unwrap().unwrap().commitments.len(), 0);

    repo_a.create_allocation(&draft(&ada, &x, 30)).unwrap();

    let err = repo_b.create_allocation(&draft(&ada, &y, 15)).unwrap_err();
    assert_eq!(
        rejection(err),
        AllocationError::CapacityExceeded {
            requested: 15,
            available: 10,
            committed: 30,
        }
    );
    assert_eq!(
        repo_a
            .list_allocations(&AllocationListQuery::default())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn held_write_lock_makes_other_writer_fail_busy_without_over_committing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("allocboard.db");
    let conn_a = open_db(&path).unwrap();
    let conn_b = open_db(&path).unwrap();

    let ada = developer(&conn_a, "Ada", Some(40));
    let x = project(&conn_a, "X");
    let y = project(&conn_a, "Y");
    let repo_a = SqliteAllocationRepository::try_new(&conn_a).unwrap();
    let repo_b = SqliteAllocationRepository::try_new(&conn_b).unwrap();
    conn_a.busy_timeout(Duration::from_millis(50)).unwrap();

    conn_b.execute_batch("BEGIN IMMEDIATE;").unwrap();
    conn_b
        .execute(
            "INSERT INTO allocations (
                uuid, developer_uuid, project_uuid, hours_allocated,
                hours_worked, allocation_percentage
            ) VALUES (?1, ?2, ?3, 30, 0, 75.0);",
            rusqlite::params![
                Uuid::new_v4().to_string(),
                ada.id.to_string(),
                x.id.to_string()
            ],
        )
        .unwrap();

    let err = repo_a.create_allocation(&draft(&ada, &y, 15)).unwrap_err();
    assert!(err.is_busy(), "unexpected error: {err}");

    conn_b.execute_batch("COMMIT;").unwrap();

    let live = repo_b
        .list_allocations(&AllocationListQuery::default())
        .unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].allocation.project_id, x.id);

    let err = repo_a.create_allocation(&draft(&ada, &y, 15)).unwrap_err();
    assert!(matches!(
        rejection(err),
        AllocationError::CapacityExceeded { available: 10, .. }
    ));
}

fn set_created_at(conn: &Connection, id: Uuid, created_at: i64) {
    conn.execute(
        "UPDATE allocations SET created_at = ?2 WHERE uuid = ?1;",
        rusqlite::params![id.to_string(), created_at],
    )
    .unwrap();
}
