//! Weekly capacity checks over a developer's current commitments.
//!
//! # Invariants
//! - Capacity `<= 0` (unset) is backfilled to
//!   [`DEFAULT_WEEKLY_CAPACITY_HOURS`] before any arithmetic.
//! - `requested == available` is admissible; one hour more is not.
//! - Editing excludes the edited allocation from the committed sum.

use crate::model::allocation::{Allocation, AllocationId, AllocationRecord};
use crate::model::developer::{Developer, DeveloperId, DEFAULT_WEEKLY_CAPACITY_HOURS};
use crate::model::project::ProjectId;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One existing allocation as seen by the capacity engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commitment {
    pub allocation_id: AllocationId,
    pub developer_id: DeveloperId,
    pub project_id: ProjectId,
    pub hours_allocated: u32,
    /// Referenced project or developer no longer resolves.
    pub orphaned: bool,
}

impl Commitment {
    pub fn from_allocation(allocation: &Allocation, orphaned: bool) -> Self {
        Self {
            allocation_id: allocation.id,
            developer_id: allocation.developer_id,
            project_id: allocation.project_id,
            hours_allocated: allocation.hours_allocated,
            orphaned,
        }
    }
}

impl From<&AllocationRecord> for Commitment {
    fn from(record: &AllocationRecord) -> Self {
        Self::from_allocation(&record.allocation, record.orphaned)
    }
}

/// A developer together with every allocation currently pointing at them.
#[derive(Debug, Clone, PartialEq)]
pub struct DeveloperSnapshot {
    pub developer: Developer,
    pub commitments: Vec<Commitment>,
}

impl DeveloperSnapshot {
    pub fn find(&self, allocation_id: AllocationId) -> Option<&Commitment> {
        self.commitments
            .iter()
            .find(|commitment| commitment.allocation_id == allocation_id)
    }
}

/// Accepted request details, returned so callers can persist and report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapacityCheck {
    pub requested_hours: u32,
    pub available_hours: i64,
    pub committed_hours: u32,
    pub allocation_percentage: f64,
}

/// Entity kind referenced by [`AllocationError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingEntity {
    Developer(DeveloperId),
    Project(ProjectId),
    Allocation(AllocationId),
}

/// Typed rejection of an allocation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// Requested hours are non-positive or not a number.
    InvalidInput(String),
    /// Requested hours exceed the remaining weekly capacity.
    CapacityExceeded {
        requested: i64,
        available: i64,
        committed: u32,
    },
    /// Referenced developer, project or edited allocation is absent.
    NotFound(MissingEntity),
    /// Developer already holds an allocation on the project.
    DuplicateAssignment {
        developer_id: DeveloperId,
        project_id: ProjectId,
    },
}

impl AllocationError {
    /// Stable machine-readable code used in logs and CLI JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::NotFound(_) => "not_found",
            Self::DuplicateAssignment { .. } => "duplicate_assignment",
        }
    }
}

impl Display for AllocationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "{message}"),
            Self::CapacityExceeded {
                requested,
                available,
                committed,
            } => write!(
                f,
                "cannot allocate {requested}h, only {available}h available, {committed}h already committed"
            ),
            Self::NotFound(MissingEntity::Developer(id)) => write!(f, "developer not found: {id}"),
            Self::NotFound(MissingEntity::Project(id)) => write!(f, "project not found: {id}"),
            Self::NotFound(MissingEntity::Allocation(id)) => {
                write!(f, "allocation not found: {id}")
            }
            Self::DuplicateAssignment {
                developer_id,
                project_id,
            } => write!(
                f,
                "developer {developer_id} is already allocated to project {project_id}"
            ),
        }
    }
}

impl Error for AllocationError {}

/// Sum of hours held by non-orphaned commitments, minus `excluding`.
pub fn committed_hours(commitments: &[Commitment], excluding: Option<AllocationId>) -> u32 {
    commitments
        .iter()
        .filter(|commitment| !commitment.orphaned)
        .filter(|commitment| Some(commitment.allocation_id) != excluding)
        .fold(0u32, |sum, commitment| {
            sum.saturating_add(commitment.hours_allocated)
        })
}

/// Remaining weekly hours. May be negative when a developer is already
/// over-committed (for example after a capacity reduction).
pub fn available_hours(
    developer: &Developer,
    commitments: &[Commitment],
    excluding: Option<AllocationId>,
) -> i64 {
    i64::from(developer.effective_capacity_hours())
        - i64::from(committed_hours(commitments, excluding))
}

/// Pre-commit admissibility check. Never mutates anything.
///
/// # Errors
/// - `InvalidInput` when `requested_hours <= 0`.
/// - `NotFound` when `excluding` names an allocation absent from `commitments`.
/// - `CapacityExceeded` when `requested_hours > available_hours(...)`.
pub fn validate_allocation_request(
    developer: &Developer,
    commitments: &[Commitment],
    requested_hours: i64,
    excluding: Option<AllocationId>,
) -> Result<CapacityCheck, AllocationError> {
    if requested_hours <= 0 {
        return Err(AllocationError::InvalidInput(
            "hours allocated must be greater than 0".to_string(),
        ));
    }

    if let Some(allocation_id) = excluding {
        if !commitments
            .iter()
            .any(|commitment| commitment.allocation_id == allocation_id)
        {
            return Err(AllocationError::NotFound(MissingEntity::Allocation(
                allocation_id,
            )));
        }
    }

    let committed = committed_hours(commitments, excluding);
    let available = i64::from(developer.effective_capacity_hours()) - i64::from(committed);
    if requested_hours > available {
        return Err(AllocationError::CapacityExceeded {
            requested: requested_hours,
            available,
            committed,
        });
    }

    // Bounded by capacity, which is a u32.
    let requested = u32::try_from(requested_hours).map_err(|_| {
        AllocationError::InvalidInput(format!("hours allocated out of range: {requested_hours}"))
    })?;

    Ok(CapacityCheck {
        requested_hours: requested,
        available_hours: available,
        committed_hours: committed,
        allocation_percentage: compute_allocation_percentage(
            requested,
            i64::from(developer.effective_capacity_hours()),
        ),
    })
}

/// `min(hours / capacity * 100, 100)`, with non-positive capacity treated as
/// the default weekly capacity.
pub fn compute_allocation_percentage(hours_allocated: u32, weekly_capacity_hours: i64) -> f64 {
    let capacity = if weekly_capacity_hours <= 0 {
        i64::from(DEFAULT_WEEKLY_CAPACITY_HOURS)
    } else {
        weekly_capacity_hours
    };
    let percentage = f64::from(hours_allocated) / capacity as f64 * 100.0;
    percentage.clamp(0.0, 100.0)
}

/// Developers that may be picked for a new (or edited) allocation on `project_id`.
///
/// A developer qualifies when they hold no live allocation on the project and
/// have strictly positive remaining capacity. When `editing` is given, its
/// hours are excluded from every capacity sum and its own developer is
/// always included. An `editing` commitment on another project is ignored.
/// Tombstoned developers never qualify. Input order is kept.
pub fn eligible_developers<'a>(
    project_id: ProjectId,
    developers: &'a [DeveloperSnapshot],
    editing: Option<&Commitment>,
) -> Vec<&'a Developer> {
    let editing = editing.filter(|commitment| commitment.project_id == project_id);
    let excluding = editing.map(|commitment| commitment.allocation_id);
    developers
        .iter()
        .filter(|snapshot| snapshot.developer.is_active())
        .filter(|snapshot| {
            if editing.is_some_and(|commitment| commitment.developer_id == snapshot.developer.id)
            {
                return true;
            }

            let already_assigned = snapshot
                .commitments
                .iter()
                .any(|commitment| !commitment.orphaned && commitment.project_id == project_id);
            if already_assigned {
                return false;
            }

            available_hours(&snapshot.developer, &snapshot.commitments, excluding) > 0
        })
        .map(|snapshot| &snapshot.developer)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        available_hours, committed_hours, compute_allocation_percentage, eligible_developers,
        validate_allocation_request, AllocationError, Commitment, DeveloperSnapshot,
        MissingEntity,
    };
    use crate::model::developer::Developer;
    use uuid::Uuid;

    fn developer(capacity: Option<u32>) -> Developer {
        let mut developer = Developer::new("Grace Hopper", "grace.hopper@company.com");
        developer.weekly_capacity_hours = capacity;
        developer
    }

    fn commitment(developer: &Developer, hours: u32) -> Commitment {
        Commitment {
            allocation_id: Uuid::new_v4(),
            developer_id: developer.id,
            project_id: Uuid::new_v4(),
            hours_allocated: hours,
            orphaned: false,
        }
    }

    #[test]
    fn full_capacity_request_on_empty_developer_is_accepted() {
        let dev = developer(Some(40));
        let check = validate_allocation_request(&dev, &[], 40, None).unwrap();
        assert_eq!(check.requested_hours, 40);
        assert_eq!(check.available_hours, 40);
        assert_eq!(check.committed_hours, 0);
        assert_eq!(check.allocation_percentage, 100.0);
    }

    #[test]
    fn request_over_remaining_capacity_reports_available_and_committed() {
        let dev = developer(Some(40));
        let existing = [commitment(&dev, 30)];

        let err = validate_allocation_request(&dev, &existing, 15, None).unwrap_err();
        assert_eq!(
            err,
            AllocationError::CapacityExceeded {
                requested: 15,
                available: 10,
                committed: 30,
            }
        );
        assert_eq!(
            err.to_string(),
            "cannot allocate 15h, only 10h available, 30h already committed"
        );
    }

    #[test]
    fn editing_excludes_the_edited_allocation_from_committed_hours() {
        let dev = developer(Some(40));
        let existing = [commitment(&dev, 30)];
        let edited = existing[0].allocation_id;

        assert_eq!(available_hours(&dev, &existing, Some(edited)), 40);
        let check = validate_allocation_request(&dev, &existing, 35, Some(edited)).unwrap();
        assert_eq!(check.allocation_percentage, 87.5);
    }

    #[test]
    fn unset_capacity_is_backfilled_and_zero_hours_is_invalid() {
        let unset = developer(None);
        let zero = developer(Some(0));
        assert_eq!(available_hours(&unset, &[], None), 40);
        assert_eq!(available_hours(&zero, &[], None), 40);

        let err = validate_allocation_request(&zero, &[], 0, None).unwrap_err();
        assert_eq!(
            err,
            AllocationError::InvalidInput("hours allocated must be greater than 0".to_string())
        );
        assert!(matches!(
            validate_allocation_request(&zero, &[], -3, None),
            Err(AllocationError::InvalidInput(_))
        ));
    }

    #[test]
    fn orphaned_commitments_do_not_count() {
        let dev = developer(Some(40));
        let mut orphan = commitment(&dev, 30);
        orphan.orphaned = true;
        let live = commitment(&dev, 5);
        let existing = [orphan, live];

        assert_eq!(committed_hours(&existing, None), 5);
        assert_eq!(available_hours(&dev, &existing, None), 35);
        assert!(validate_allocation_request(&dev, &existing, 35, None).is_ok());
    }

    #[test]
    fn exact_fill_is_accepted_and_one_more_hour_is_rejected() {
        let dev = developer(Some(37));
        let existing = [commitment(&dev, 12)];
        let available = available_hours(&dev, &existing, None);
        assert_eq!(available, 25);

        assert!(validate_allocation_request(&dev, &existing, available, None).is_ok());
        assert!(matches!(
            validate_allocation_request(&dev, &existing, available + 1, None),
            Err(AllocationError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn accepted_requests_never_push_sum_over_capacity() {
        let dev = developer(Some(40));
        let mut existing: Vec<Commitment> = Vec::new();
        for requested in [7, 13, 25, 9, 11, 1, 40, 2] {
            if let Ok(check) = validate_allocation_request(&dev, &existing, requested, None) {
                existing.push(commitment(&dev, check.requested_hours));
            }
            assert!(committed_hours(&existing, None) <= dev.effective_capacity_hours());
        }
        assert_eq!(committed_hours(&existing, None), 40);
    }

    #[test]
    fn editing_a_missing_allocation_is_not_found() {
        let dev = developer(Some(40));
        let existing = [commitment(&dev, 10)];
        let missing = Uuid::new_v4();

        let err = validate_allocation_request(&dev, &existing, 5, Some(missing)).unwrap_err();
        assert_eq!(
            err,
            AllocationError::NotFound(MissingEntity::Allocation(missing))
        );
    }

    #[test]
    fn available_hours_is_idempotent_and_may_go_negative() {
        let dev = developer(Some(20));
        let existing = [commitment(&dev, 15), commitment(&dev, 10)];
        let first = available_hours(&dev, &existing, None);
        let second = available_hours(&dev, &existing, None);
        assert_eq!(first, second);
        assert_eq!(first, -5);
    }

    #[test]
    fn percentage_is_monotonic_and_bounded() {
        for capacity in [1_i64, 8, 40, 60] {
            let mut previous = 0.0;
            for hours in 0..=100_u32 {
                let percentage = compute_allocation_percentage(hours, capacity);
                assert!(percentage >= previous);
                assert!((0.0..=100.0).contains(&percentage));
                previous = percentage;
            }
        }
        assert_eq!(compute_allocation_percentage(20, 0), 50.0);
        assert_eq!(compute_allocation_percentage(20, -8), 50.0);
        assert_eq!(compute_allocation_percentage(90, 40), 100.0);
    }

    #[test]
    fn eligible_developers_skips_assigned_and_full_developers() {
        let project_id = Uuid::new_v4();

        let free = developer(Some(40));
        let full = developer(Some(10));
        let assigned = developer(Some(40));

        let full_commitment = commitment(&full, 10);
        let mut assigned_commitment = commitment(&assigned, 5);
        assigned_commitment.project_id = project_id;

        let snapshots = vec![
            DeveloperSnapshot {
                developer: free.clone(),
                commitments: Vec::new(),
            },
            DeveloperSnapshot {
                developer: full.clone(),
                commitments: vec![full_commitment],
            },
            DeveloperSnapshot {
                developer: assigned.clone(),
                commitments: vec![assigned_commitment],
            },
        ];

        let eligible = eligible_developers(project_id, &snapshots, None);
        let ids: Vec<_> = eligible.iter().map(|developer| developer.id).collect();
        assert_eq!(ids, vec![free.id]);

        // Editing the assigned developer's allocation brings them back.
        let eligible = eligible_developers(project_id, &snapshots, Some(&assigned_commitment));
        let ids: Vec<_> = eligible.iter().map(|developer| developer.id).collect();
        assert_eq!(ids, vec![free.id, assigned.id]);
    }

    #[test]
    fn editing_a_commitment_on_another_project_grants_no_exception() {
        let project_id = Uuid::new_v4();
        let dev = developer(Some(40));
        let mut on_project = commitment(&dev, 10);
        on_project.project_id = project_id;
        let elsewhere = commitment(&dev, 10);

        let snapshots = vec![DeveloperSnapshot {
            developer: dev.clone(),
            commitments: vec![on_project, elsewhere],
        }];
        assert!(eligible_developers(project_id, &snapshots, None).is_empty());
        assert!(eligible_developers(project_id, &snapshots, Some(&elsewhere)).is_empty());
        assert_eq!(
            eligible_developers(project_id, &snapshots, Some(&on_project)).len(),
            1
        );
    }

    #[test]
    fn eligible_developers_ignores_orphaned_commitments() {
        let project_id = Uuid::new_v4();
        let dev = developer(Some(40));
        let mut orphan = commitment(&dev, 40);
        orphan.project_id = project_id;
        orphan.orphaned = true;

        let snapshots = vec![DeveloperSnapshot {
            developer: dev.clone(),
            commitments: vec![orphan],
        }];
        let eligible = eligible_developers(project_id, &snapshots, None);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, dev.id);
    }

    #[test]
    fn eligible_developers_skips_tombstoned_developers() {
        let mut gone = developer(Some(40));
        gone.soft_delete();
        let snapshots = vec![DeveloperSnapshot {
            developer: gone,
            commitments: Vec::new(),
        }];
        assert!(eligible_developers(Uuid::new_v4(), &snapshots, None).is_empty());
    }
}
