//! Dashboard and developer statistics.

use crate::model::allocation::AllocationRecord;
use crate::model::developer::{Developer, DeveloperId};
use crate::model::project::{Project, ProjectId, ProjectStatus};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: ProjectStatus,
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_projects: usize,
    pub active_projects: usize,
    pub completed_projects: usize,
    pub total_developers: usize,
    pub available_developers: usize,
    /// One entry per pipeline stage, including empty stages.
    pub by_status: Vec<StatusCount>,
}

/// Counts over live projects and developers. Tombstoned rows are skipped.
pub fn dashboard_summary(projects: &[Project], developers: &[Developer]) -> DashboardSummary {
    let live_projects: Vec<&Project> = projects.iter().filter(|p| p.is_active()).collect();
    let count_status = |status: ProjectStatus| {
        live_projects
            .iter()
            .filter(|project| project.status == status)
            .count()
    };
    let live_developers = developers.iter().filter(|d| d.is_active());

    DashboardSummary {
        total_projects: live_projects.len(),
        active_projects: count_status(ProjectStatus::Active),
        completed_projects: count_status(ProjectStatus::Completed),
        total_developers: live_developers.clone().count(),
        available_developers: live_developers.filter(|d| d.is_available).count(),
        by_status: ProjectStatus::PIPELINE
            .into_iter()
            .map(|status| StatusCount {
                status,
                label: status.label(),
                count: count_status(status),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeveloperUtilization {
    pub developer_id: DeveloperId,
    pub name: String,
    pub capacity_hours: u32,
    pub hours_allocated: u32,
    pub hours_worked: u32,
    /// Committed share of weekly capacity. May exceed 100 after a capacity cut.
    pub utilization_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeveloperSummary {
    pub total_developers: usize,
    pub available_developers: usize,
    pub busy_developers: usize,
    pub total_hours_allocated: u64,
    pub total_hours_worked: u64,
    /// Mean of `allocation_percentage` over live allocations; 0 when none.
    pub average_allocation_percentage: f64,
    pub developers: Vec<DeveloperUtilization>,
}

pub fn developer_summary(
    developers: &[Developer],
    allocations: &[AllocationRecord],
) -> DeveloperSummary {
    let live_developers: Vec<&Developer> = developers.iter().filter(|d| d.is_active()).collect();
    let live_allocations: Vec<&AllocationRecord> =
        allocations.iter().filter(|record| !record.orphaned).collect();

    let total_hours_allocated = live_allocations
        .iter()
        .map(|record| u64::from(record.allocation.hours_allocated))
        .sum();
    let total_hours_worked = live_allocations
        .iter()
        .map(|record| u64::from(record.allocation.hours_worked))
        .sum();
    let average_allocation_percentage = if live_allocations.is_empty() {
        0.0
    } else {
        live_allocations
            .iter()
            .map(|record| record.allocation.allocation_percentage)
            .sum::<f64>()
            / live_allocations.len() as f64
    };

    let per_developer = live_developers
        .iter()
        .map(|developer| {
            let mine = live_allocations
                .iter()
                .filter(|record| record.allocation.developer_id == developer.id);
            let hours_allocated = mine
                .clone()
                .map(|record| record.allocation.hours_allocated)
                .fold(0u32, u32::saturating_add);
            let hours_worked = mine
                .map(|record| record.allocation.hours_worked)
                .fold(0u32, u32::saturating_add);
            let capacity_hours = developer.effective_capacity_hours();
            DeveloperUtilization {
                developer_id: developer.id,
                name: developer.name.clone(),
                capacity_hours,
                hours_allocated,
                hours_worked,
                utilization_percentage: f64::from(hours_allocated) / f64::from(capacity_hours)
                    * 100.0,
            }
        })
        .collect();

    let available_developers = live_developers.iter().filter(|d| d.is_available).count();
    DeveloperSummary {
        total_developers: live_developers.len(),
        available_developers,
        busy_developers: live_developers.len() - available_developers,
        total_hours_allocated,
        total_hours_worked,
        average_allocation_percentage,
        developers: per_developer,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectStaffing {
    pub project_id: ProjectId,
    pub assigned_developers: usize,
    pub total_hours_allocated: u64,
    pub total_hours_worked: u64,
}

pub fn project_staffing(project: &Project, allocations: &[AllocationRecord]) -> ProjectStaffing {
    let live = allocations
        .iter()
        .filter(|record| !record.orphaned && record.allocation.project_id == project.id);

    let mut staffing = ProjectStaffing {
        project_id: project.id,
        assigned_developers: 0,
        total_hours_allocated: 0,
        total_hours_worked: 0,
    };
    for record in live {
        staffing.assigned_developers += 1;
        staffing.total_hours_allocated += u64::from(record.allocation.hours_allocated);
        staffing.total_hours_worked += u64::from(record.allocation.hours_worked);
    }
    staffing
}

#[cfg(test)]
mod tests {
    use super::{dashboard_summary, developer_summary, project_staffing};
    use crate::model::allocation::{Allocation, AllocationRecord};
    use crate::model::developer::Developer;
    use crate::model::project::{Project, ProjectCategory, ProjectStatus};

    fn record(developer: &Developer, project: &Project, hours: u32, orphaned: bool) -> AllocationRecord {
        let mut allocation = Allocation::new(
            developer.id,
            project.id,
            hours,
            f64::from(hours) / f64::from(developer.effective_capacity_hours()) * 100.0,
        );
        allocation.hours_worked = hours / 2;
        AllocationRecord {
            allocation,
            developer_name: Some(developer.name.clone()),
            project_name: (!orphaned).then(|| project.name.clone()),
            orphaned,
        }
    }

    #[test]
    fn dashboard_counts_every_stage_and_skips_tombstones() {
        let mut active = Project::new("Portal", vec![ProjectCategory::Web]);
        active.status = ProjectStatus::Active;
        let mut done = Project::new("App", vec![ProjectCategory::Mobile]);
        done.status = ProjectStatus::Completed;
        let mut deleted = Project::new("Gone", vec![ProjectCategory::Other]);
        deleted.status = ProjectStatus::Active;
        deleted.soft_delete();

        let mut busy = Developer::new("Bo", "bo@company.com");
        busy.is_available = false;
        let free = Developer::new("Al", "al@company.com");

        let summary = dashboard_summary(&[active, done, deleted], &[busy, free]);
        assert_eq!(summary.total_projects, 2);
        assert_eq!(summary.active_projects, 1);
        assert_eq!(summary.completed_projects, 1);
        assert_eq!(summary.total_developers, 2);
        assert_eq!(summary.available_developers, 1);
        assert_eq!(summary.by_status.len(), ProjectStatus::PIPELINE.len());
        assert_eq!(summary.by_status[0].status, ProjectStatus::NewProjectsInPipeline);
        assert_eq!(summary.by_status[0].count, 0);
    }

    #[test]
    fn developer_summary_ignores_orphaned_allocations() {
        let developer = Developer::new("Ada", "ada@company.com");
        let live = Project::new("Portal", vec![ProjectCategory::Web]);
        let gone = Project::new("Gone", vec![ProjectCategory::Web]);
        let allocations = vec![
            record(&developer, &live, 20, false),
            record(&developer, &gone, 10, true),
        ];

        let summary = developer_summary(&[developer], &allocations);
        assert_eq!(summary.total_hours_allocated, 20);
        assert_eq!(summary.total_hours_worked, 10);
        assert_eq!(summary.average_allocation_percentage, 50.0);
        assert_eq!(summary.developers[0].hours_allocated, 20);
        assert_eq!(summary.developers[0].utilization_percentage, 50.0);
    }

    #[test]
    fn developer_summary_without_allocations_has_zero_average() {
        let summary = developer_summary(&[Developer::new("Ada", "ada@company.com")], &[]);
        assert_eq!(summary.average_allocation_percentage, 0.0);
        assert_eq!(summary.busy_developers, 0);
    }

    #[test]
    fn staffing_counts_only_the_project_live_rows() {
        let ada = Developer::new("Ada", "ada@company.com");
        let bo = Developer::new("Bo", "bo@company.com");
        let portal = Project::new("Portal", vec![ProjectCategory::Web]);
        let other = Project::new("Other", vec![ProjectCategory::Web]);
        let allocations = vec![
            record(&ada, &portal, 10, false),
            record(&bo, &portal, 6, true),
            record(&bo, &other, 8, false),
        ];

        let staffing = project_staffing(&portal, &allocations);
        assert_eq!(staffing.assigned_developers, 1);
        assert_eq!(staffing.total_hours_allocated, 10);
        assert_eq!(staffing.total_hours_worked, 5);
    }
}
