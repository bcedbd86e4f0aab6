//! Project domain model.
//!
//! # Responsibility
//! - Define project lifecycle (pipeline stage), priority and category enums.
//! - Provide the stable string codes used by storage and the CLI.
//!
//! # Invariants
//! - A project always carries at least one category.
//! - `end_date` is not earlier than `start_date` when both are set.
//! - [`ProjectStatus::PIPELINE`] is the canonical board column order.

use super::{validate_date_range, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable project identifier.
pub type ProjectId = Uuid;

/// Pipeline stage of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    NewProjectsInPipeline,
    GatheringRequirements,
    WaitingForClientApproval,
    ClientNotResponding,
    Started,
    Active,
    Completed,
    Stopped,
}

impl ProjectStatus {
    /// All stages in board order.
    pub const PIPELINE: [ProjectStatus; 8] = [
        ProjectStatus::NewProjectsInPipeline,
        ProjectStatus::GatheringRequirements,
        ProjectStatus::WaitingForClientApproval,
        ProjectStatus::ClientNotResponding,
        ProjectStatus::Started,
        ProjectStatus::Active,
        ProjectStatus::Completed,
        ProjectStatus::Stopped,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewProjectsInPipeline => "new_projects_in_pipeline",
            Self::GatheringRequirements => "gathering_requirements",
            Self::WaitingForClientApproval => "waiting_for_client_approval",
            Self::ClientNotResponding => "client_not_responding",
            Self::Started => "started",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::PIPELINE
            .into_iter()
            .find(|status| status.as_str() == value.trim())
    }

    /// Human-facing column title.
    pub fn label(self) -> &'static str {
        match self {
            Self::NewProjectsInPipeline => "New Projects in Pipeline",
            Self::GatheringRequirements => "Gathering Requirements",
            Self::WaitingForClientApproval => "Waiting for Client Approval",
            Self::ClientNotResponding => "Client Not Responding",
            Self::Started => "Started",
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Stopped => "Stopped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl ProjectPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

/// Work category. Stored with its display code (`UI/UX`, `DevOps`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectCategory {
    Web,
    Mobile,
    #[serde(rename = "UI/UX")]
    UiUx,
    Backend,
    DevOps,
    Other,
}

impl ProjectCategory {
    pub const ALL: [ProjectCategory; 6] = [
        ProjectCategory::Web,
        ProjectCategory::Mobile,
        ProjectCategory::UiUx,
        ProjectCategory::Backend,
        ProjectCategory::DevOps,
        ProjectCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Web => "Web",
            Self::Mobile => "Mobile",
            Self::UiUx => "UI/UX",
            Self::Backend => "Backend",
            Self::DevOps => "DevOps",
            Self::Other => "Other",
        }
    }

    /// Parses a category code case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
    }
}

/// A unit of client work that developers are allocated to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub priority: ProjectPriority,
    /// Ordered, deduplicated. The first entry is the primary category.
    pub categories: Vec<ProjectCategory>,
    /// Unix epoch milliseconds.
    pub start_date: Option<i64>,
    /// Unix epoch milliseconds. Should be >= `start_date` when set.
    pub end_date: Option<i64>,
    pub is_deleted: bool,
}

impl Project {
    /// Creates a project in the first pipeline stage with medium priority.
    pub fn new(name: impl Into<String>, categories: Vec<ProjectCategory>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            status: ProjectStatus::NewProjectsInPipeline,
            priority: ProjectPriority::Medium,
            categories,
            start_date: None,
            end_date: None,
            is_deleted: false,
        }
    }

    /// First category, kept for single-category consumers such as board filters.
    pub fn primary_category(&self) -> Option<ProjectCategory> {
        self.categories.first().copied()
    }

    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName);
        }
        if self.categories.is_empty() {
            return Err(ValidationError::EmptyCategories);
        }
        validate_date_range(self.start_date, self.end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::{Project, ProjectCategory, ProjectStatus};
    use crate::model::ValidationError;

    #[test]
    fn status_codes_roundtrip_for_every_stage() {
        for status in ProjectStatus::PIPELINE {
            assert_eq!(ProjectStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProjectStatus::parse("archived"), None);
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(ProjectCategory::parse("ui/ux"), Some(ProjectCategory::UiUx));
        assert_eq!(ProjectCategory::parse(" devops "), Some(ProjectCategory::DevOps));
        assert_eq!(ProjectCategory::parse("Hardware"), None);
    }

    #[test]
    fn validate_rejects_inverted_dates() {
        let mut project = Project::new("Portal", vec![ProjectCategory::Web]);
        project.start_date = Some(2_000);
        project.end_date = Some(1_000);
        assert_eq!(
            project.validate(),
            Err(ValidationError::InvalidDateRange {
                start: 2_000,
                end: 1_000
            })
        );
    }

    #[test]
    fn validate_requires_a_category() {
        let project = Project::new("Portal", Vec::new());
        assert_eq!(project.validate(), Err(ValidationError::EmptyCategories));
    }
}
