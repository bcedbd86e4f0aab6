//! Developer domain model.
//!
//! # Invariants
//! - `id` is stable and never reused for another developer.
//! - An unset or zero weekly capacity is treated as
//!   [`DEFAULT_WEEKLY_CAPACITY_HOURS`] by every computation.

use super::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable developer identifier.
pub type DeveloperId = Uuid;

/// Capacity used whenever a developer has no positive weekly capacity.
pub const DEFAULT_WEEKLY_CAPACITY_HOURS: u32 = 40;

/// A person whose weekly hours are allocated to projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Developer {
    pub id: DeveloperId,
    pub name: String,
    pub email: String,
    pub skills: Vec<String>,
    /// Weekly working hours. `None` or `Some(0)` means "use the default".
    pub weekly_capacity_hours: Option<u32>,
    pub is_available: bool,
    /// Soft delete tombstone. Allocations pointing here become orphaned.
    pub is_deleted: bool,
}

impl Developer {
    /// Creates an available developer with a generated id and default capacity.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name, email)
    }

    /// Creates a developer with a caller-provided stable id.
    pub fn with_id(id: DeveloperId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            skills: Vec::new(),
            weekly_capacity_hours: None,
            is_available: true,
            is_deleted: false,
        }
    }

    /// Weekly capacity with the soft default applied.
    pub fn effective_capacity_hours(&self) -> u32 {
        match self.weekly_capacity_hours {
            Some(hours) if hours > 0 => hours,
            _ => DEFAULT_WEEKLY_CAPACITY_HOURS,
        }
    }

    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Validates shape-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName);
        }
        Ok(())
    }
}
