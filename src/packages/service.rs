use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::auth::CallerIdentity;
use crate::users::{DirectoryError, UserDirectory};

use super::codes::{self, AllocationError, MAX_ATTEMPTS};
use super::domain::{
    IntakeRequest, PackageId, PackageRecord, ValidationError, UNKNOWN_WITHDRAWER,
};
use super::repository::{
    NewPackage, PackageFilter, PackageRepository, PendingTransition, RepositoryError,
};

/// Service composing intake, code allocation, and the lifecycle state
/// machine over a package store and the resident directory.
pub struct PackageService<R, D> {
    repository: Arc<R>,
    directory: Arc<D>,
}

#[derive(Debug, thiserror::Error)]
pub enum PackageServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error("package not found")]
    NotFound,
    #[error("operation is not legal for the package's current state")]
    InvalidState,
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl<R, D> PackageService<R, D>
where
    R: PackageRepository + 'static,
    D: UserDirectory + 'static,
{
    pub fn new(repository: Arc<R>, directory: Arc<D>) -> Self {
        Self {
            repository,
            directory,
        }
    }

    /// Register a newly arrived package: validate the intake fields, allocate
    /// both codes, and insert. The store's uniqueness constraint is the
    /// correctness backstop for the allocator's pre-check; losing that race
    /// re-runs allocation rather than failing the intake, bounded by the
    /// same attempt cap. Nothing is persisted unless the insert succeeds.
    pub fn register(
        &self,
        request: IntakeRequest,
        now: DateTime<Utc>,
    ) -> Result<PackageRecord, PackageServiceError> {
        let intake = request.validate()?;

        for attempt in 0..MAX_ATTEMPTS {
            let tracking_code = match &intake.tracking_code_override {
                Some(code) => code.clone(),
                None => self.allocate(codes::tracking_candidate)?,
            };
            let retrieval_code = self.allocate(codes::retrieval_candidate)?;

            let insert = self.repository.insert(NewPackage {
                department: intake.department.clone(),
                kind: intake.kind,
                comments: intake.comments.clone(),
                urgent: intake.urgent,
                tracking_code,
                retrieval_code,
                ingested_at: now,
            });

            match insert {
                Ok(record) => {
                    info!(
                        package = %record.id.0,
                        department = %record.department,
                        urgent = record.urgent,
                        "package registered"
                    );
                    return Ok(record);
                }
                // Concurrent intake claimed one of the codes between the
                // pre-check and the insert. Redraw and try again.
                Err(RepositoryError::DuplicateCode) => {
                    debug!(attempt, "code collision at insert, reallocating");
                    continue;
                }
                Err(other) => return Err(PackageServiceError::Repository(other)),
            }
        }

        Err(AllocationError::Exhausted.into())
    }

    /// Hand a pending package over: `pending -> withdrawn`, stamped exactly
    /// once with the withdrawal time and who performed it. The transition is
    /// a conditional write keyed on the pending state, so two concurrent
    /// withdrawals cannot both succeed.
    pub fn withdraw(
        &self,
        id: &PackageId,
        acting: &CallerIdentity,
        now: DateTime<Utc>,
    ) -> Result<PackageRecord, PackageServiceError> {
        let current = self
            .repository
            .fetch(id)
            .map_err(PackageServiceError::Repository)?
            .ok_or(PackageServiceError::NotFound)?;

        let withdrawn_by = self.resolve_withdrawer(acting, &current.department)?;

        let record = self
            .repository
            .transition(id, PendingTransition::Withdraw {
                at: now,
                by: withdrawn_by,
            })
            .map_err(Self::map_transition_error)?;

        info!(package = %record.id.0, by = %record.withdrawn_by.as_deref().unwrap_or(UNKNOWN_WITHDRAWER), "package withdrawn");
        Ok(record)
    }

    /// `pending -> lost`. Terminal, no further metadata.
    pub fn mark_lost(&self, id: &PackageId) -> Result<PackageRecord, PackageServiceError> {
        let record = self
            .repository
            .transition(id, PendingTransition::MarkLost)
            .map_err(Self::map_transition_error)?;
        info!(package = %record.id.0, "package marked lost");
        Ok(record)
    }

    pub fn get(&self, id: &PackageId) -> Result<PackageRecord, PackageServiceError> {
        self.repository
            .fetch(id)
            .map_err(PackageServiceError::Repository)?
            .ok_or(PackageServiceError::NotFound)
    }

    /// Concierge listing, newest first.
    pub fn list(&self, filter: &PackageFilter) -> Result<Vec<PackageRecord>, PackageServiceError> {
        self.repository
            .list(filter)
            .map_err(PackageServiceError::Repository)
    }

    /// Who gets recorded on the withdrawal: the explicitly referenced user
    /// when the gateway supplied one, otherwise the first resident of the
    /// package's department, otherwise the `unknown` sentinel. Department
    /// match is a fallback only; several residents can share a unit.
    fn resolve_withdrawer(
        &self,
        acting: &CallerIdentity,
        department: &str,
    ) -> Result<String, PackageServiceError> {
        if let Some(user_id) = acting.user_id.as_deref() {
            if let Some(profile) = self.directory.find_by_id(user_id)? {
                return Ok(profile.descriptor());
            }
        }

        if let Some(profile) = self.directory.find_by_department(department)? {
            return Ok(profile.descriptor());
        }

        Ok(UNKNOWN_WITHDRAWER.to_string())
    }

    /// Draw a candidate and pre-check it against the store, bounded. The
    /// pre-check keeps the common path collision-free; the insert constraint
    /// catches the race it cannot see.
    fn allocate(&self, draw: fn() -> String) -> Result<String, PackageServiceError> {
        for _ in 0..MAX_ATTEMPTS {
            let candidate = draw();
            let taken = self
                .repository
                .code_in_use(&candidate)
                .map_err(PackageServiceError::Repository)?;
            if !taken {
                return Ok(candidate);
            }
        }
        Err(AllocationError::Exhausted.into())
    }

    fn map_transition_error(error: RepositoryError) -> PackageServiceError {
        match error {
            RepositoryError::NotFound => PackageServiceError::NotFound,
            RepositoryError::StateConflict => PackageServiceError::InvalidState,
            other => PackageServiceError::Repository(other),
        }
    }
}
