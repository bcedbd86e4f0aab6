//! Command handlers. Each builds the repository/service it needs over the
//! shared connection and renders the result.

use crate::output::{allocation_line, developer_line, format_date, print_json, project_line};
use allocboard_core::db::migrations::current_user_version;
use allocboard_core::report::{
    board_columns, calendar_events, calendar_summary, dashboard_summary, developer_summary,
    project_staffing, BoardFilter,
};
use allocboard_core::{
    logging_status, parse_requested_hours, AllocationDraft, AllocationId, AllocationListQuery,
    AllocationRecord, AllocationService, AllocationServiceError, AllocationUpdate, DeveloperId,
    DeveloperInput, DeveloperPatch, DeveloperService, ProductDefaults, ProjectCategory, ProjectId,
    ProjectInput, ProjectListQuery, ProjectPatch, ProjectService, ProjectStatus, RepoError,
    SqliteAllocationRepository, SqliteDeveloperRepository, SqliteProjectRepository,
};
use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;

pub struct Context<'conn> {
    pub conn: &'conn Connection,
    pub defaults: ProductDefaults,
    pub json: bool,
}

impl<'conn> Context<'conn> {
    fn developers(&self) -> Result<DeveloperService<SqliteDeveloperRepository<'conn>>, String> {
        let repo = SqliteDeveloperRepository::try_new(self.conn).map_err(repo_failure)?;
        Ok(DeveloperService::new(repo, self.defaults.clone()))
    }

    fn projects(&self) -> Result<ProjectService<SqliteProjectRepository<'conn>>, String> {
        let repo = SqliteProjectRepository::try_new(self.conn).map_err(repo_failure)?;
        Ok(ProjectService::new(repo, self.defaults.clone()))
    }

    fn allocations(&self) -> Result<AllocationService<SqliteAllocationRepository<'conn>>, String> {
        let repo = SqliteAllocationRepository::try_new(self.conn).map_err(repo_failure)?;
        Ok(AllocationService::new(repo))
    }

    /// Rejections keep their machine code in JSON mode.
    fn allocation_failure(&self, err: AllocationServiceError) -> String {
        if self.json {
            return json!({
                "error": {
                    "code": err.code(),
                    "message": err.to_string(),
                }
            })
            .to_string();
        }
        err.to_string()
    }
}

fn repo_failure(err: RepoError) -> String {
    format!("storage not ready: {err}")
}

pub fn init(ctx: &Context<'_>) -> Result<(), String> {
    let version = current_user_version(ctx.conn).map_err(|err| err.to_string())?;
    let logging = logging_status();
    if ctx.json {
        return print_json(&json!({ "schema_version": version, "logging": logging }));
    }
    println!("database ready (schema version {version})");
    match logging {
        Some(status) => println!(
            "logging {} to {}",
            status.level,
            status.log_dir.display()
        ),
        None => println!("file logging off (pass --log-dir to enable)"),
    }
    Ok(())
}

pub fn developer_add(
    ctx: &Context<'_>,
    name: String,
    email: Option<String>,
    skills: Vec<String>,
    capacity: Option<String>,
    is_available: bool,
) -> Result<(), String> {
    let developer = ctx
        .developers()?
        .create_developer(DeveloperInput {
            name,
            email,
            skills,
            capacity,
            is_available: Some(is_available),
        })
        .map_err(|err| err.to_string())?;
    if ctx.json {
        return print_json(&developer);
    }
    println!("{}", developer_line(&developer));
    Ok(())
}

pub fn developer_update(
    ctx: &Context<'_>,
    id: DeveloperId,
    patch: DeveloperPatch,
) -> Result<(), String> {
    let developer = ctx
        .developers()?
        .update_developer(id, patch)
        .map_err(|err| err.to_string())?;
    if ctx.json {
        return print_json(&developer);
    }
    println!("{}", developer_line(&developer));
    Ok(())
}

pub fn developer_list(ctx: &Context<'_>) -> Result<(), String> {
    let developers = ctx
        .developers()?
        .list_developers()
        .map_err(|err| err.to_string())?;
    if ctx.json {
        return print_json(&developers);
    }
    for developer in &developers {
        println!("{}", developer_line(developer));
    }
    Ok(())
}

pub fn developer_remove(ctx: &Context<'_>, id: DeveloperId) -> Result<(), String> {
    ctx.developers()?
        .delete_developer(id)
        .map_err(|err| err.to_string())?;
    if ctx.json {
        return print_json(&json!({ "removed": id }));
    }
    println!("removed developer {id}; their allocations are now orphaned");
    Ok(())
}

pub fn project_add(ctx: &Context<'_>, input: ProjectInput) -> Result<(), String> {
    let project = ctx
        .projects()?
        .create_project(input)
        .map_err(|err| err.to_string())?;
    if ctx.json {
        return print_json(&project);
    }
    println!("{}", project_line(&project));
    Ok(())
}

pub fn project_update(ctx: &Context<'_>, id: ProjectId, patch: ProjectPatch) -> Result<(), String> {
    let project = ctx
        .projects()?
        .update_project(id, patch)
        .map_err(|err| err.to_string())?;
    if ctx.json {
        return print_json(&project);
    }
    println!("{}", project_line(&project));
    Ok(())
}

pub fn project_status(ctx: &Context<'_>, id: ProjectId, status: ProjectStatus) -> Result<(), String> {
    let project = ctx
        .projects()?
        .change_status(id, status)
        .map_err(|err| err.to_string())?;
    if ctx.json {
        return print_json(&project);
    }
    println!("{} moved to {}", project.name, project.status.label());
    Ok(())
}

pub fn project_list(
    ctx: &Context<'_>,
    status: Option<ProjectStatus>,
    category: Option<ProjectCategory>,
) -> Result<(), String> {
    let projects = ctx
        .projects()?
        .list_projects(&ProjectListQuery {
            status,
            category,
            include_deleted: false,
        })
        .map_err(|err| err.to_string())?;
    if ctx.json {
        return print_json(&projects);
    }
    for project in &projects {
        println!("{}", project_line(project));
    }
    Ok(())
}

pub fn project_remove(ctx: &Context<'_>, id: ProjectId) -> Result<(), String> {
    ctx.projects()?
        .delete_project(id)
        .map_err(|err| err.to_string())?;
    if ctx.json {
        return print_json(&json!({ "removed": id }));
    }
    println!("removed project {id}; its allocations are now orphaned");
    Ok(())
}

pub fn allocation_assign(
    ctx: &Context<'_>,
    developer_id: DeveloperId,
    project_id: ProjectId,
    hours: &str,
    start_date: Option<i64>,
    end_date: Option<i64>,
) -> Result<(), String> {
    let service = ctx.allocations()?;
    let hours_allocated = parse_requested_hours(hours)
        .map_err(|err| ctx.allocation_failure(err.into()))?;
    let record = service
        .assign(&AllocationDraft {
            developer_id,
            project_id,
            hours_allocated,
            start_date,
            end_date,
        })
        .map_err(|err| ctx.allocation_failure(err))?;
    print_allocation(ctx, "assigned", &record)
}

pub fn allocation_edit(
    ctx: &Context<'_>,
    id: AllocationId,
    hours: &str,
    start_date: Option<i64>,
    end_date: Option<i64>,
) -> Result<(), String> {
    let service = ctx.allocations()?;
    let hours_allocated = parse_requested_hours(hours)
        .map_err(|err| ctx.allocation_failure(err.into()))?;
    let record = service
        .edit(
            id,
            &AllocationUpdate {
                hours_allocated,
                start_date,
                end_date,
            },
        )
        .map_err(|err| ctx.allocation_failure(err))?;
    print_allocation(ctx, "updated", &record)
}

pub fn allocation_unassign(ctx: &Context<'_>, id: AllocationId) -> Result<(), String> {
    ctx.allocations()?
        .unassign(id)
        .map_err(|err| ctx.allocation_failure(err))?;
    if ctx.json {
        return print_json(&json!({ "removed": id }));
    }
    println!("unassigned allocation {id}");
    Ok(())
}

pub fn allocation_worked(ctx: &Context<'_>, id: AllocationId, hours: i64) -> Result<(), String> {
    let record = ctx
        .allocations()?
        .record_hours_worked(id, hours)
        .map_err(|err| ctx.allocation_failure(err))?;
    print_allocation(ctx, "recorded", &record)
}

pub fn allocation_list(
    ctx: &Context<'_>,
    developer_id: Option<DeveloperId>,
    project_id: Option<ProjectId>,
    include_orphaned: bool,
) -> Result<(), String> {
    let records = ctx
        .allocations()?
        .list_allocations(&AllocationListQuery {
            developer_id,
            project_id,
            include_orphaned,
        })
        .map_err(|err| ctx.allocation_failure(err))?;
    if ctx.json {
        return print_json(&records);
    }
    for record in &records {
        println!("{}", allocation_line(record));
    }
    Ok(())
}

pub fn allocation_eligible(
    ctx: &Context<'_>,
    project_id: ProjectId,
    editing: Option<AllocationId>,
) -> Result<(), String> {
    let developers = ctx
        .allocations()?
        .eligible_developers(project_id, editing)
        .map_err(|err| ctx.allocation_failure(err))?;
    if ctx.json {
        return print_json(&developers);
    }
    if developers.is_empty() {
        println!("no developer has remaining capacity for this project");
    }
    for developer in &developers {
        println!("{}", developer_line(developer));
    }
    Ok(())
}

fn print_allocation(ctx: &Context<'_>, verb: &str, record: &AllocationRecord) -> Result<(), String> {
    if ctx.json {
        return print_json(record);
    }
    println!(
        "{verb} {}h ({:.1}% of weekly capacity)",
        record.allocation.hours_allocated, record.allocation.allocation_percentage
    );
    println!("{}", allocation_line(record));
    Ok(())
}

pub fn dashboard(ctx: &Context<'_>) -> Result<(), String> {
    let projects = ctx
        .projects()?
        .list_projects(&ProjectListQuery::default())
        .map_err(|err| err.to_string())?;
    let developers = ctx
        .developers()?
        .list_developers()
        .map_err(|err| err.to_string())?;
    let allocations = ctx
        .allocations()?
        .list_allocations(&AllocationListQuery::default())
        .map_err(|err| ctx.allocation_failure(err))?;

    let overview = dashboard_summary(&projects, &developers);
    let team = developer_summary(&developers, &allocations);
    if ctx.json {
        return print_json(&json!({ "projects": overview, "developers": team }));
    }

    println!(
        "projects: {} total, {} active, {} completed",
        overview.total_projects, overview.active_projects, overview.completed_projects
    );
    for entry in &overview.by_status {
        println!("  {:<28} {}", entry.label, entry.count);
    }
    println!(
        "developers: {} total, {} available, {} busy",
        team.total_developers, team.available_developers, team.busy_developers
    );
    println!(
        "hours: {} allocated, {} worked, average allocation {:.1}%",
        team.total_hours_allocated, team.total_hours_worked, team.average_allocation_percentage
    );
    for entry in &team.developers {
        println!(
            "  {:<24} {:>3}/{}h  {:>5.1}%",
            entry.name, entry.hours_allocated, entry.capacity_hours, entry.utilization_percentage
        );
    }
    Ok(())
}

pub fn board(
    ctx: &Context<'_>,
    project_id: Option<ProjectId>,
    category: Option<ProjectCategory>,
) -> Result<(), String> {
    let projects = ctx
        .projects()?
        .list_projects(&ProjectListQuery::default())
        .map_err(|err| err.to_string())?;
    let allocations = ctx
        .allocations()?
        .list_allocations(&AllocationListQuery::default())
        .map_err(|err| ctx.allocation_failure(err))?;

    let columns = board_columns(
        &projects,
        &BoardFilter {
            project_id,
            category,
        },
    );
    if ctx.json {
        return print_json(&columns);
    }

    for column in &columns {
        println!("{} ({})", column.title, column.projects.len());
        for project in &column.projects {
            let staffing = project_staffing(project, &allocations);
            println!(
                "  {}  {}  [{}]  {} developer(s), {}h",
                project.id,
                project.name,
                project.priority.as_str(),
                staffing.assigned_developers,
                staffing.total_hours_allocated
            );
        }
    }
    Ok(())
}

pub fn calendar(ctx: &Context<'_>, at: Option<i64>) -> Result<(), String> {
    let projects = ctx
        .projects()?
        .list_projects(&ProjectListQuery::default())
        .map_err(|err| err.to_string())?;
    let now = at.unwrap_or_else(|| Utc::now().timestamp_millis());

    let events = calendar_events(&projects, ctx.defaults.calendar_span_ms());
    let summary = calendar_summary(&events, now);
    if ctx.json {
        return print_json(&json!({ "events": events, "summary": summary }));
    }

    for event in &events {
        println!(
            "{} .. {}{}  {:<28} {}",
            format_date(Some(event.start)),
            format_date(Some(event.end)),
            if event.open_ended { "*" } else { " " },
            event.title,
            event.status.label()
        );
    }
    println!(
        "scheduled={} started={} upcoming={} ended={}",
        summary.scheduled, summary.started, summary.upcoming, summary.ended
    );
    Ok(())
}
