//! Allocation use-case service.
//!
//! # Responsibility
//! - Expose assign/edit/unassign/hours-worked operations to callers.
//! - Provide the eligible-developer choice set and capacity previews.
//! - Report every engine rejection as a typed [`AllocationError`].
//!
//! # Invariants
//! - Mutations go through repository methods that re-check capacity inside
//!   an immediate transaction; previews never write.
//! - Requested-hours text is parsed strictly. Nothing defaults to zero.

use crate::engine::capacity::{
    self, AllocationError, CapacityCheck, Commitment, MissingEntity,
};
use crate::model::allocation::{AllocationId, AllocationRecord};
use crate::model::developer::{Developer, DeveloperId};
use crate::model::project::ProjectId;
use crate::repo::allocation_repo::{
    AllocationDraft, AllocationListQuery, AllocationRepository, AllocationUpdate,
};
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for allocation use-cases.
#[derive(Debug)]
pub enum AllocationServiceError {
    /// Request refused by validation; message is operator-facing.
    Rejected(AllocationError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl AllocationServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rejected(err) => err.code(),
            Self::Repo(err) if err.is_busy() => "database_busy",
            Self::Repo(_) => "storage_error",
        }
    }

    pub fn rejection(&self) -> Option<&AllocationError> {
        match self {
            Self::Rejected(err) => Some(err),
            Self::Repo(_) => None,
        }
    }
}

impl Display for AllocationServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AllocationServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Rejected(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for AllocationServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Rejected(err) => Self::Rejected(err),
            RepoError::NotFound(missing) => Self::Rejected(AllocationError::NotFound(missing)),
            other => Self::Repo(other),
        }
    }
}

impl From<AllocationError> for AllocationServiceError {
    fn from(value: AllocationError) -> Self {
        Self::Rejected(value)
    }
}

/// Allocation service facade over repository implementations.
pub struct AllocationService<R: AllocationRepository> {
    repo: R,
}

impl<R: AllocationRepository> AllocationService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Assigns a developer to a project after duplicate and capacity checks.
    pub fn assign(
        &self,
        draft: &AllocationDraft,
    ) -> Result<AllocationRecord, AllocationServiceError> {
        let record = self
            .repo
            .create_allocation(draft)
            .map_err(|err| log_rejection("allocation_assign", err.into()))?;
        info!(
            "event=allocation_assign module=service status=ok hours={} percentage={:.1}",
            record.allocation.hours_allocated, record.allocation.allocation_percentage
        );
        Ok(record)
    }

    /// Changes the hours (and dates) of an existing allocation. The edited
    /// allocation's own hours are excluded from the capacity sum.
    pub fn edit(
        &self,
        id: AllocationId,
        update: &AllocationUpdate,
    ) -> Result<AllocationRecord, AllocationServiceError> {
        let record = self
            .repo
            .update_allocation(id, update)
            .map_err(|err| log_rejection("allocation_edit", err.into()))?;
        info!(
            "event=allocation_edit module=service status=ok hours={} percentage={:.1}",
            record.allocation.hours_allocated, record.allocation.allocation_percentage
        );
        Ok(record)
    }

    pub fn unassign(&self, id: AllocationId) -> Result<(), AllocationServiceError> {
        self.repo
            .delete_allocation(id)
            .map_err(|err| log_rejection("allocation_unassign", err.into()))?;
        info!("event=allocation_unassign module=service status=ok");
        Ok(())
    }

    /// Records hours actually worked. Not bounded by capacity.
    pub fn record_hours_worked(
        &self,
        id: AllocationId,
        hours_worked: i64,
    ) -> Result<AllocationRecord, AllocationServiceError> {
        let hours = u32::try_from(hours_worked).map_err(|_| {
            AllocationError::InvalidInput(format!(
                "hours worked must be between 0 and {}",
                u32::MAX
            ))
        })?;
        self.repo.set_hours_worked(id, hours)?;
        info!("event=allocation_worked module=service status=ok hours={hours}");
        self.get_allocation(id)
    }

    pub fn get_allocation(
        &self,
        id: AllocationId,
    ) -> Result<AllocationRecord, AllocationServiceError> {
        self.repo
            .get_allocation(id)?
            .ok_or(AllocationServiceError::Rejected(AllocationError::NotFound(
                MissingEntity::Allocation(id),
            )))
    }

    pub fn list_allocations(
        &self,
        query: &AllocationListQuery,
    ) -> Result<Vec<AllocationRecord>, AllocationServiceError> {
        Ok(self.repo.list_allocations(query)?)
    }

    /// Developers selectable for `project_id`. Pass `editing` when the choice
    /// set backs an edit form so the allocation's own developer stays listed.
    /// The edited allocation must sit on `project_id`.
    pub fn eligible_developers(
        &self,
        project_id: ProjectId,
        editing: Option<AllocationId>,
    ) -> Result<Vec<Developer>, AllocationServiceError> {
        if !self.repo.project_exists(project_id)? {
            return Err(AllocationError::NotFound(MissingEntity::Project(project_id)).into());
        }

        let editing = match editing {
            Some(id) => {
                let record = self.get_allocation(id)?;
                if record.allocation.project_id != project_id {
                    return Err(AllocationError::InvalidInput(format!(
                        "allocation {id} does not belong to project {project_id}"
                    ))
                    .into());
                }
                Some(Commitment::from(&record))
            }
            None => None,
        };
        let snapshots = self.repo.developer_snapshots()?;
        Ok(
            capacity::eligible_developers(project_id, &snapshots, editing.as_ref())
                .into_iter()
                .cloned()
                .collect(),
        )
    }

    /// Runs the capacity check against a fresh snapshot without writing.
    pub fn check_request(
        &self,
        developer_id: DeveloperId,
        requested_hours: i64,
        excluding: Option<AllocationId>,
    ) -> Result<CapacityCheck, AllocationServiceError> {
        let snapshot = self.repo.developer_snapshot(developer_id)?.ok_or(
            AllocationError::NotFound(MissingEntity::Developer(developer_id)),
        )?;
        Ok(capacity::validate_allocation_request(
            &snapshot.developer,
            &snapshot.commitments,
            requested_hours,
            excluding,
        )?)
    }
}

/// Parses operator-typed hours. Blank or non-integer text is `InvalidInput`;
/// the sign is checked later by the engine.
pub fn parse_requested_hours(raw: &str) -> Result<i64, AllocationError> {
    let trimmed = raw.trim();
    trimmed.parse::<i64>().map_err(|_| {
        AllocationError::InvalidInput(format!("hours allocated must be a whole number: `{trimmed}`"))
    })
}

fn log_rejection(event: &str, err: AllocationServiceError) -> AllocationServiceError {
    match &err {
        AllocationServiceError::Rejected(rejection) => warn!(
            "event={event} module=service status=rejected code={}",
            rejection.code()
        ),
        AllocationServiceError::Repo(_) => warn!(
            "event={event} module=service status=error code={}",
            err.code()
        ),
    }
    err
}
