//! Project use-case service.
//!
//! # Responsibility
//! - Create and edit projects from operator input.
//! - Move projects between pipeline stages (board moves).
//!
//! # Invariants
//! - Categories are deduplicated in input order; empty input becomes the
//!   configured default category.
//! - Deleting a project orphans its allocations instead of removing them.

use crate::config::ProductDefaults;
use crate::engine::capacity::MissingEntity;
use crate::model::project::{Project, ProjectCategory, ProjectId, ProjectPriority, ProjectStatus};
use crate::model::ValidationError;
use crate::repo::project_repo::{ProjectListQuery, ProjectRepository};
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ProjectServiceError {
    /// Input violates a project shape rule (blank name, inverted dates).
    InvalidProject(ValidationError),
    ProjectNotFound(ProjectId),
    Repo(RepoError),
}

impl Display for ProjectServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidProject(err) => write!(f, "{err}"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidProject(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::ProjectNotFound(_) => None,
        }
    }
}

impl From<RepoError> for ProjectServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(MissingEntity::Project(id)) => Self::ProjectNotFound(id),
            RepoError::Validation(err) => Self::InvalidProject(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ProjectServiceError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidProject(value)
    }
}

/// Operator input for creating a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectInput {
    pub name: String,
    pub description: Option<String>,
    pub categories: Vec<ProjectCategory>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<ProjectPriority>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}

/// Partial update. `None` keeps the stored value.
///
/// Dates use a nested option: `Some(None)` clears the date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub categories: Option<Vec<ProjectCategory>>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<ProjectPriority>,
    pub start_date: Option<Option<i64>>,
    pub end_date: Option<Option<i64>>,
}

pub struct ProjectService<R: ProjectRepository> {
    repo: R,
    defaults: ProductDefaults,
}

impl<R: ProjectRepository> ProjectService<R> {
    pub fn new(repo: R, defaults: ProductDefaults) -> Self {
        Self { repo, defaults }
    }

    pub fn create_project(&self, input: ProjectInput) -> Result<Project, ProjectServiceError> {
        let categories = normalize_categories(input.categories, self.defaults.default_category);
        let mut project = Project::new(input.name.trim(), categories);
        project.description = normalize_description(input.description);
        if let Some(status) = input.status {
            project.status = status;
        }
        if let Some(priority) = input.priority {
            project.priority = priority;
        }
        project.start_date = input.start_date;
        project.end_date = input.end_date;
        project.validate()?;

        self.repo.create_project(&project)?;
        info!(
            "event=project_create module=service status=ok stage={}",
            project.status.as_str()
        );
        Ok(project)
    }

    pub fn update_project(
        &self,
        id: ProjectId,
        patch: ProjectPatch,
    ) -> Result<Project, ProjectServiceError> {
        let mut project = self.get_project(id)?;

        if let Some(name) = patch.name {
            project.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            project.description = normalize_description(description);
        }
        if let Some(categories) = patch.categories {
            project.categories = normalize_categories(categories, self.defaults.default_category);
        }
        if let Some(status) = patch.status {
            project.status = status;
        }
        if let Some(priority) = patch.priority {
            project.priority = priority;
        }
        if let Some(start_date) = patch.start_date {
            project.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            project.end_date = end_date;
        }
        project.validate()?;

        self.repo.update_project(&project)?;
        info!("event=project_update module=service status=ok");
        Ok(project)
    }

    /// Moves a project to another pipeline stage.
    pub fn change_status(
        &self,
        id: ProjectId,
        status: ProjectStatus,
    ) -> Result<Project, ProjectServiceError> {
        let previous = self.get_project(id)?.status;
        self.repo.set_status(id, status)?;
        info!(
            "event=project_status module=service status=ok from={} to={}",
            previous.as_str(),
            status.as_str()
        );
        self.get_project(id)
    }

    pub fn get_project(&self, id: ProjectId) -> Result<Project, ProjectServiceError> {
        self.repo
            .get_project(id, false)?
            .ok_or(ProjectServiceError::ProjectNotFound(id))
    }

    pub fn list_projects(
        &self,
        query: &ProjectListQuery,
    ) -> Result<Vec<Project>, ProjectServiceError> {
        Ok(self.repo.list_projects(query)?)
    }

    pub fn delete_project(&self, id: ProjectId) -> Result<(), ProjectServiceError> {
        self.repo.soft_delete_project(id)?;
        info!("event=project_delete module=service status=ok");
        Ok(())
    }
}

/// Dedupes categories in order; empty input becomes `[fallback]`.
pub fn normalize_categories(
    categories: Vec<ProjectCategory>,
    fallback: ProjectCategory,
) -> Vec<ProjectCategory> {
    let mut normalized = Vec::with_capacity(categories.len());
    for category in categories {
        if !normalized.contains(&category) {
            normalized.push(category);
        }
    }
    if normalized.is_empty() {
        normalized.push(fallback);
    }
    normalized
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
