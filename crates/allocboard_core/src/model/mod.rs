//! Domain model for developers, projects and hour allocations.
//!
//! # Responsibility
//! - Define canonical data structures used by engine, repositories and reports.
//! - Own shape-level validation that does not need storage context.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Developers and projects are soft-deleted (tombstoned), never hard-deleted.
//! - Allocations are join records and are removed on unassignment.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod allocation;
pub mod developer;
pub mod project;

/// Shape-level validation failure for a domain record.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required display name is blank after trim.
    BlankName,
    /// Project has no categories.
    EmptyCategories,
    /// `end` is earlier than `start`.
    InvalidDateRange { start: i64, end: i64 },
    /// Derived percentage is outside `0..=100`.
    PercentageOutOfRange(f64),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "name must not be blank"),
            Self::EmptyCategories => write!(f, "project must have at least one category"),
            Self::InvalidDateRange { start, end } => {
                write!(f, "end date {end} is earlier than start date {start}")
            }
            Self::PercentageOutOfRange(value) => {
                write!(f, "allocation percentage {value} is outside 0..=100")
            }
        }
    }
}

impl Error for ValidationError {}

/// Checks an optional `[start, end]` range stored as epoch milliseconds.
pub(crate) fn validate_date_range(
    start: Option<i64>,
    end: Option<i64>,
) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ValidationError::InvalidDateRange { start, end });
        }
    }
    Ok(())
}
