use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::packages::PackageId;

use super::domain::{ClaimId, ClaimRecord};
use super::repository::{ClaimRepository, ClaimRepositoryError, NewClaim};

/// Thin facade over the claim store: residents file, concierges resolve.
pub struct ClaimService<R> {
    repository: Arc<R>,
}

#[derive(Debug, thiserror::Error)]
pub enum ClaimServiceError {
    #[error("claim description must not be empty")]
    InvalidInput,
    #[error("claim not found")]
    NotFound,
    #[error("claim is already resolved")]
    InvalidState,
    #[error(transparent)]
    Repository(ClaimRepositoryError),
}

impl<R> ClaimService<R>
where
    R: ClaimRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// File a pending claim against a package. The package reference is
    /// data-level linkage only; it is stored as given.
    pub fn file(
        &self,
        package_ref: PackageId,
        user_ref: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<ClaimRecord, ClaimServiceError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(ClaimServiceError::InvalidInput);
        }

        let record = self
            .repository
            .insert(NewClaim {
                package_ref,
                user_ref: user_ref.to_string(),
                description: description.to_string(),
                created_at: now,
            })
            .map_err(ClaimServiceError::Repository)?;

        info!(claim = %record.id.0, package = %record.package_ref.0, "claim filed");
        Ok(record)
    }

    /// `pending -> resolved`, stamping `resolved_at` and the resolution text
    /// exactly once.
    pub fn resolve(
        &self,
        id: &ClaimId,
        resolution: &str,
        now: DateTime<Utc>,
    ) -> Result<ClaimRecord, ClaimServiceError> {
        let record = self
            .repository
            .resolve(id, resolution.trim().to_string(), now)
            .map_err(|error| match error {
                ClaimRepositoryError::NotFound => ClaimServiceError::NotFound,
                ClaimRepositoryError::StateConflict => ClaimServiceError::InvalidState,
                other => ClaimServiceError::Repository(other),
            })?;

        info!(claim = %record.id.0, "claim resolved");
        Ok(record)
    }

    /// Concierge view of every claim, newest first.
    pub fn list(&self) -> Result<Vec<ClaimRecord>, ClaimServiceError> {
        self.repository.all().map_err(ClaimServiceError::Repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::domain::ClaimState;
    use crate::claims::repository::MemoryClaimRepository;
    use chrono::TimeZone;

    fn service() -> ClaimService<MemoryClaimRepository> {
        ClaimService::new(Arc::new(MemoryClaimRepository::default()))
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).single().expect("valid timestamp")
    }

    #[test]
    fn file_rejects_blank_descriptions() {
        let service = service();
        let result = service.file(PackageId("pkg-000001".into()), "user-1", "   ", at(9));
        assert!(matches!(result, Err(ClaimServiceError::InvalidInput)));
    }

    #[test]
    fn file_creates_pending_claims() {
        let service = service();
        let claim = service
            .file(
                PackageId("pkg-000001".into()),
                "user-1",
                " box arrived crushed ",
                at(9),
            )
            .expect("claim files");

        assert_eq!(claim.state, ClaimState::Pending);
        assert_eq!(claim.description, "box arrived crushed");
        assert!(claim.resolved_at.is_none());
        assert!(claim.resolution.is_none());
    }

    #[test]
    fn resolve_stamps_once_and_rejects_repeats() {
        let service = service();
        let claim = service
            .file(PackageId("pkg-000001".into()), "user-1", "wrong unit", at(9))
            .expect("claim files");

        let resolved = service
            .resolve(&claim.id, "redelivered to 101", at(10))
            .expect("claim resolves");
        assert_eq!(resolved.state, ClaimState::Resolved);
        assert_eq!(resolved.resolved_at, Some(at(10)));
        assert_eq!(resolved.resolution.as_deref(), Some("redelivered to 101"));

        let second = service.resolve(&claim.id, "again", at(11));
        assert!(matches!(second, Err(ClaimServiceError::InvalidState)));

        // First resolution survives untouched.
        let stored = service.list().expect("list succeeds");
        assert_eq!(stored[0].resolved_at, Some(at(10)));
        assert_eq!(stored[0].resolution.as_deref(), Some("redelivered to 101"));
    }

    #[test]
    fn resolve_missing_claim_is_not_found() {
        let service = service();
        let result = service.resolve(&ClaimId("claim-999999".into()), "done", at(10));
        assert!(matches!(result, Err(ClaimServiceError::NotFound)));
    }

    #[test]
    fn list_returns_newest_first() {
        let service = service();
        service
            .file(PackageId("pkg-000001".into()), "user-1", "first", at(8))
            .expect("claim files");
        service
            .file(PackageId("pkg-000002".into()), "user-2", "second", at(9))
            .expect("claim files");

        let claims = service.list().expect("list succeeds");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].description, "second");
        assert_eq!(claims[1].description, "first");
    }
}
