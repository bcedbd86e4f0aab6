//! Read-only projections for dashboard, board and calendar views.
//!
//! # Responsibility
//! - Aggregate repository read models into serializable summaries.
//! - Stay pure: no storage access, no clock access (callers pass `now`).
//!
//! # Invariants
//! - Orphaned allocations never contribute to any aggregate.
//! - Board columns always follow [`ProjectStatus::PIPELINE`] order.
//!
//! [`ProjectStatus::PIPELINE`]: crate::model::project::ProjectStatus::PIPELINE

pub mod board;
pub mod calendar;
pub mod dashboard;

pub use board::{board_columns, BoardColumn, BoardFilter};
pub use calendar::{calendar_events, calendar_summary, CalendarEvent, CalendarSummary};
pub use dashboard::{
    dashboard_summary, developer_summary, project_staffing, DashboardSummary,
    DeveloperSummary, DeveloperUtilization, ProjectStaffing, StatusCount,
};
