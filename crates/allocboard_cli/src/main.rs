//! Operator CLI for the allocation board.
//!
//! # Responsibility
//! - Parse commands and global options, bootstrap logging and storage.
//! - Render results as text or JSON (`--json`).
//!
//! # Invariants
//! - Failures print one message to stderr and exit non-zero.
//! - Engine rejections are shown verbatim.

#![forbid(unsafe_code)]

mod commands;
mod output;

use allocboard_core::{
    init_logging, open_db, ProductDefaults, ProjectCategory, ProjectPriority, ProjectStatus,
};
use clap::{ArgAction, Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "allocboard")]
#[command(about = "Developer-to-project hour allocation board", version)]
struct Cli {
    /// SQLite database file.
    #[arg(long, global = true, env = "ALLOCBOARD_DB", default_value = "allocboard.db")]
    db: PathBuf,
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    /// File log level (trace|debug|info|warn|error). Needs `--log-dir`.
    #[arg(long, global = true, requires = "log_dir")]
    log_level: Option<String>,
    /// Enables file logging into this directory.
    #[arg(long, global = true, env = "ALLOCBOARD_LOG_DIR")]
    log_dir: Option<String>,
    /// JSON document overriding product defaults.
    #[arg(long, global = true)]
    defaults: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Creates or migrates the database.
    Init,
    Developer {
        #[command(subcommand)]
        command: DeveloperCommand,
    },
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    Allocation {
        #[command(subcommand)]
        command: AllocationCommand,
    },
    Dashboard,
    Board {
        #[arg(long)]
        project: Option<Uuid>,
        #[arg(long, value_parser = parse_category)]
        category: Option<ProjectCategory>,
    },
    Calendar {
        /// Reference instant for the summary, `YYYY-MM-DD`. Defaults to now.
        #[arg(long, value_parser = output::parse_date)]
        at: Option<i64>,
    },
}

#[derive(Subcommand)]
enum DeveloperCommand {
    Add {
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long = "skill", action = ArgAction::Append)]
        skills: Vec<String>,
        /// Weekly hours. Unusable values fall back to the default.
        #[arg(long, allow_hyphen_values = true)]
        capacity: Option<String>,
        #[arg(long, default_value_t = false)]
        unavailable: bool,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Replaces all skills when given at least once.
        #[arg(long = "skill", action = ArgAction::Append)]
        skills: Vec<String>,
        #[arg(long, allow_hyphen_values = true)]
        capacity: Option<String>,
        #[arg(long)]
        available: Option<bool>,
    },
    List,
    Remove {
        id: Uuid,
    },
}

#[derive(Subcommand)]
enum ProjectCommand {
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "category", action = ArgAction::Append, value_parser = parse_category)]
        categories: Vec<ProjectCategory>,
        #[arg(long, value_parser = parse_status)]
        status: Option<ProjectStatus>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<ProjectPriority>,
        #[arg(long, value_parser = output::parse_date)]
        start: Option<i64>,
        #[arg(long, value_parser = output::parse_date)]
        end: Option<i64>,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "category", action = ArgAction::Append, value_parser = parse_category)]
        categories: Vec<ProjectCategory>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<ProjectPriority>,
        #[arg(long, value_parser = output::parse_date, conflicts_with = "clear_start")]
        start: Option<i64>,
        #[arg(long, value_parser = output::parse_date, conflicts_with = "clear_end")]
        end: Option<i64>,
        #[arg(long, default_value_t = false)]
        clear_start: bool,
        #[arg(long, default_value_t = false)]
        clear_end: bool,
    },
    /// Moves a project to another pipeline stage.
    Status {
        id: Uuid,
        #[arg(value_parser = parse_status)]
        status: ProjectStatus,
    },
    List {
        #[arg(long, value_parser = parse_status)]
        status: Option<ProjectStatus>,
        #[arg(long, value_parser = parse_category)]
        category: Option<ProjectCategory>,
    },
    Remove {
        id: Uuid,
    },
}

#[derive(Subcommand)]
enum AllocationCommand {
    Assign {
        #[arg(long)]
        developer: Uuid,
        #[arg(long)]
        project: Uuid,
        #[arg(long, allow_hyphen_values = true)]
        hours: String,
        #[arg(long, value_parser = output::parse_date)]
        start: Option<i64>,
        #[arg(long, value_parser = output::parse_date)]
        end: Option<i64>,
    },
    Edit {
        id: Uuid,
        #[arg(long, allow_hyphen_values = true)]
        hours: String,
        #[arg(long, value_parser = output::parse_date)]
        start: Option<i64>,
        #[arg(long, value_parser = output::parse_date)]
        end: Option<i64>,
    },
    Unassign {
        id: Uuid,
    },
    /// Records hours actually worked on an allocation.
    Worked {
        id: Uuid,
        #[arg(allow_hyphen_values = true)]
        hours: i64,
    },
    List {
        #[arg(long)]
        developer: Option<Uuid>,
        #[arg(long)]
        project: Option<Uuid>,
        #[arg(long, default_value_t = false)]
        include_orphaned: bool,
    },
    /// Lists developers that can take an allocation on a project.
    Eligible {
        #[arg(long)]
        project: Uuid,
        #[arg(long)]
        editing: Option<Uuid>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(cli.log_level.as_deref(), log_dir).map_err(|err| err.to_string())?;
    }

    let defaults = match cli.defaults.as_ref() {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|err| format!("cannot read defaults `{}`: {err}", path.display()))?;
            ProductDefaults::from_json_str(&raw)?
        }
        None => ProductDefaults::default(),
    };

    let conn = open_db(&cli.db).map_err(|err| format!("cannot open database: {err}"))?;
    info!("event=cli_command module=cli status=start");
    let ctx = commands::Context {
        conn: &conn,
        defaults,
        json: cli.json,
    };

    match cli.command {
        Commands::Init => commands::init(&ctx),
        Commands::Developer { command } => match command {
            DeveloperCommand::Add {
                name,
                email,
                skills,
                capacity,
                unavailable,
            } => commands::developer_add(&ctx, name, email, skills, capacity, !unavailable),
            DeveloperCommand::Update {
                id,
                name,
                email,
                skills,
                capacity,
                available,
            } => commands::developer_update(
                &ctx,
                id,
                allocboard_core::DeveloperPatch {
                    name,
                    email,
                    skills: (!skills.is_empty()).then_some(skills),
                    capacity,
                    is_available: available,
                },
            ),
            DeveloperCommand::List => commands::developer_list(&ctx),
            DeveloperCommand::Remove { id } => commands::developer_remove(&ctx, id),
        },
        Commands::Project { command } => match command {
            ProjectCommand::Add {
                name,
                description,
                categories,
                status,
                priority,
                start,
                end,
            } => commands::project_add(
                &ctx,
                allocboard_core::ProjectInput {
                    name,
                    description,
                    categories,
                    status,
                    priority,
                    start_date: start,
                    end_date: end,
                },
            ),
            ProjectCommand::Update {
                id,
                name,
                description,
                categories,
                priority,
                start,
                end,
                clear_start,
                clear_end,
            } => commands::project_update(
                &ctx,
                id,
                allocboard_core::ProjectPatch {
                    name,
                    description: description.map(Some),
                    categories: (!categories.is_empty()).then_some(categories),
                    status: None,
                    priority,
                    start_date: date_patch(start, clear_start),
                    end_date: date_patch(end, clear_end),
                },
            ),
            ProjectCommand::Status { id, status } => commands::project_status(&ctx, id, status),
            ProjectCommand::List { status, category } => {
                commands::project_list(&ctx, status, category)
            }
            ProjectCommand::Remove { id } => commands::project_remove(&ctx, id),
        },
        Commands::Allocation { command } => match command {
            AllocationCommand::Assign {
                developer,
                project,
                hours,
                start,
                end,
            } => commands::allocation_assign(&ctx, developer, project, &hours, start, end),
            AllocationCommand::Edit {
                id,
                hours,
                start,
                end,
            } => commands::allocation_edit(&ctx, id, &hours, start, end),
            AllocationCommand::Unassign { id } => commands::allocation_unassign(&ctx, id),
            AllocationCommand::Worked { id, hours } => {
                commands::allocation_worked(&ctx, id, hours)
            }
            AllocationCommand::List {
                developer,
                project,
                include_orphaned,
            } => commands::allocation_list(&ctx, developer, project, include_orphaned),
            AllocationCommand::Eligible { project, editing } => {
                commands::allocation_eligible(&ctx, project, editing)
            }
        },
        Commands::Dashboard => commands::dashboard(&ctx),
        Commands::Board { project, category } => commands::board(&ctx, project, category),
        Commands::Calendar { at } => commands::calendar(&ctx, at),
    }
}

fn date_patch(value: Option<i64>, clear: bool) -> Option<Option<i64>> {
    if clear {
        return Some(None);
    }
    value.map(Some)
}

fn parse_status(raw: &str) -> Result<ProjectStatus, String> {
    ProjectStatus::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = ProjectStatus::PIPELINE
            .iter()
            .map(|status| status.as_str())
            .collect();
        format!("unknown status `{raw}`; expected one of {}", known.join("|"))
    })
}

fn parse_priority(raw: &str) -> Result<ProjectPriority, String> {
    ProjectPriority::parse(raw)
        .ok_or_else(|| format!("unknown priority `{raw}`; expected low|medium|high|urgent"))
}

fn parse_category(raw: &str) -> Result<ProjectCategory, String> {
    ProjectCategory::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = ProjectCategory::ALL
            .iter()
            .map(|category| category.as_str())
            .collect();
        format!("unknown category `{raw}`; expected one of {}", known.join("|"))
    })
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::error::ErrorKind;
    use clap::Parser;

    #[test]
    fn log_level_without_log_dir_is_a_usage_error() {
        if std::env::var_os("ALLOCBOARD_LOG_DIR").is_some() {
            return;
        }
        let err = Cli::try_parse_from(["allocboard", "--log-level", "debug", "dashboard"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from([
            "allocboard",
            "--log-level",
            "debug",
            "--log-dir",
            "logs",
            "dashboard",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_dir.as_deref(), Some("logs"));
    }
}
