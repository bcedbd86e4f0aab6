//! Pipeline board grouping.

use crate::model::project::{Project, ProjectCategory, ProjectId, ProjectStatus};
use serde::Serialize;

/// Board filter. `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardFilter {
    pub project_id: Option<ProjectId>,
    /// Matched against the primary category.
    pub category: Option<ProjectCategory>,
}

impl BoardFilter {
    fn matches(&self, project: &Project) -> bool {
        let project_match = self.project_id.map_or(true, |id| project.id == id);
        let category_match = self
            .category
            .map_or(true, |category| project.primary_category() == Some(category));
        project_match && category_match
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardColumn {
    pub status: ProjectStatus,
    pub title: &'static str,
    pub projects: Vec<Project>,
}

/// One column per pipeline stage, in pipeline order. Input order is kept
/// within a column.
pub fn board_columns(projects: &[Project], filter: &BoardFilter) -> Vec<BoardColumn> {
    ProjectStatus::PIPELINE
        .into_iter()
        .map(|status| BoardColumn {
            status,
            title: status.label(),
            projects: projects
                .iter()
                .filter(|project| project.is_active() && project.status == status)
                .filter(|project| filter.matches(project))
                .cloned()
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{board_columns, BoardFilter};
    use crate::model::project::{Project, ProjectCategory, ProjectStatus};

    fn project(name: &str, status: ProjectStatus, categories: Vec<ProjectCategory>) -> Project {
        let mut project = Project::new(name, categories);
        project.status = status;
        project
    }

    #[test]
    fn columns_follow_pipeline_order_even_when_empty() {
        let columns = board_columns(&[], &BoardFilter::default());
        let statuses: Vec<ProjectStatus> = columns.iter().map(|column| column.status).collect();
        assert_eq!(statuses, ProjectStatus::PIPELINE.to_vec());
        assert!(columns.iter().all(|column| column.projects.is_empty()));
    }

    #[test]
    fn category_filter_uses_primary_category() {
        let projects = vec![
            project(
                "Portal",
                ProjectStatus::Active,
                vec![ProjectCategory::Web, ProjectCategory::Mobile],
            ),
            project("App", ProjectStatus::Active, vec![ProjectCategory::Mobile]),
            project("Api", ProjectStatus::Started, vec![ProjectCategory::Backend]),
        ];
        let filter = BoardFilter {
            category: Some(ProjectCategory::Mobile),
            ..BoardFilter::default()
        };

        let columns = board_columns(&projects, &filter);
        let active = columns
            .iter()
            .find(|column| column.status == ProjectStatus::Active)
            .expect("active column");
        assert_eq!(active.projects.len(), 1);
        assert_eq!(active.projects[0].name, "App");
        assert_eq!(columns.iter().map(|c| c.projects.len()).sum::<usize>(), 1);
    }

    #[test]
    fn project_filter_and_tombstones() {
        let keep = project("Keep", ProjectStatus::Started, vec![ProjectCategory::Web]);
        let mut gone = project("Gone", ProjectStatus::Started, vec![ProjectCategory::Web]);
        gone.soft_delete();
        let filter = BoardFilter {
            project_id: Some(keep.id),
            ..BoardFilter::default()
        };

        let columns = board_columns(&[keep.clone(), gone], &filter);
        let total: Vec<&Project> = columns.iter().flat_map(|c| c.projects.iter()).collect();
        assert_eq!(total.len(), 1);
        assert_eq!(total[0].id, keep.id);
    }
}
