//! Core domain logic for allocboard.
//! This crate is the single source of truth for capacity invariants.

pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod report;
pub mod service;

pub use config::ProductDefaults;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use engine::capacity::{
    available_hours, committed_hours, compute_allocation_percentage, eligible_developers,
    validate_allocation_request, AllocationError, CapacityCheck, Commitment, DeveloperSnapshot,
    MissingEntity,
};
pub use logging::{
    default_log_level, init_logging, logging_status, LoggingError, LoggingStatus,
};
pub use model::allocation::{Allocation, AllocationId, AllocationRecord};
pub use model::developer::{Developer, DeveloperId, DEFAULT_WEEKLY_CAPACITY_HOURS};
pub use model::project::{Project, ProjectCategory, ProjectId, ProjectPriority, ProjectStatus};
pub use model::ValidationError;
pub use repo::allocation_repo::{
    AllocationDraft, AllocationListQuery, AllocationRepository, AllocationUpdate,
    SqliteAllocationRepository,
};
pub use repo::developer_repo::{DeveloperRepository, SqliteDeveloperRepository};
pub use repo::project_repo::{ProjectListQuery, ProjectRepository, SqliteProjectRepository};
pub use repo::{RepoError, RepoResult};
pub use service::allocation_service::{
    parse_requested_hours, AllocationService, AllocationServiceError,
};
pub use service::developer_service::{
    DeveloperInput, DeveloperPatch, DeveloperService, DeveloperServiceError,
};
pub use service::project_service::{
    ProjectInput, ProjectPatch, ProjectService, ProjectServiceError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
