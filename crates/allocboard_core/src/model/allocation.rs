//! Allocation join record between a developer and a project.
//!
//! # Invariants
//! - `allocation_percentage` is derived from `hours_allocated` and the
//!   developer's effective capacity; it is never set independently.
//! - `hours_worked` is tracked independently of `hours_allocated`.
//! - A developer holds at most one allocation per project.

use super::developer::DeveloperId;
use super::project::ProjectId;
use super::{validate_date_range, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable allocation identifier.
pub type AllocationId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub developer_id: DeveloperId,
    pub project_id: ProjectId,
    pub hours_allocated: u32,
    pub hours_worked: u32,
    /// Share of weekly capacity, in `0.0..=100.0`.
    pub allocation_percentage: f64,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}

impl Allocation {
    /// Creates an allocation with a generated id and no hours worked yet.
    pub fn new(
        developer_id: DeveloperId,
        project_id: ProjectId,
        hours_allocated: u32,
        allocation_percentage: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            developer_id,
            project_id,
            hours_allocated,
            hours_worked: 0,
            allocation_percentage,
            start_date: None,
            end_date: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=100.0).contains(&self.allocation_percentage) {
            return Err(ValidationError::PercentageOutOfRange(
                self.allocation_percentage,
            ));
        }
        validate_date_range(self.start_date, self.end_date)
    }
}

/// Allocation read model joined with reference resolution.
///
/// `orphaned` is true when the referenced project or developer is
/// tombstoned; such rows are kept for display but ignored by aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    #[serde(flatten)]
    pub allocation: Allocation,
    pub developer_name: Option<String>,
    pub project_name: Option<String>,
    pub orphaned: bool,
}
