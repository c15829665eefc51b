use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::packages::PackageId;

use super::domain::{ClaimId, ClaimRecord, ClaimState};

#[derive(Debug, thiserror::Error)]
pub enum ClaimRepositoryError {
    #[error("claim not found")]
    NotFound,
    /// The claim was already resolved; `resolved_at`/`resolution` are
    /// write-once.
    #[error("claim is already resolved")]
    StateConflict,
    #[error("claim store unavailable: {0}")]
    Unavailable(String),
}

/// Insert payload; the store assigns the id and the pending state.
#[derive(Debug, Clone)]
pub struct NewClaim {
    pub package_ref: PackageId,
    pub user_ref: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Storage abstraction for claims. `resolve` is a conditional write keyed
/// on `state = pending`, matching the package store's transition contract.
pub trait ClaimRepository: Send + Sync {
    fn insert(&self, claim: NewClaim) -> Result<ClaimRecord, ClaimRepositoryError>;
    fn fetch(&self, id: &ClaimId) -> Result<Option<ClaimRecord>, ClaimRepositoryError>;
    fn resolve(
        &self,
        id: &ClaimId,
        resolution: String,
        at: DateTime<Utc>,
    ) -> Result<ClaimRecord, ClaimRepositoryError>;
    /// All claims, newest first.
    fn all(&self) -> Result<Vec<ClaimRecord>, ClaimRepositoryError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    sequence: u64,
    records: BTreeMap<String, ClaimRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryClaimRepository {
    state: Mutex<MemoryState>,
}

impl MemoryClaimRepository {
    fn guard(&self) -> Result<MutexGuard<'_, MemoryState>, ClaimRepositoryError> {
        self.state
            .lock()
            .map_err(|_| ClaimRepositoryError::Unavailable("store lock poisoned".to_string()))
    }
}

impl ClaimRepository for MemoryClaimRepository {
    fn insert(&self, claim: NewClaim) -> Result<ClaimRecord, ClaimRepositoryError> {
        let mut state = self.guard()?;
        state.sequence += 1;
        let id = ClaimId(format!("claim-{:06}", state.sequence));
        let record = ClaimRecord {
            id: id.clone(),
            package_ref: claim.package_ref,
            user_ref: claim.user_ref,
            description: claim.description,
            state: ClaimState::Pending,
            created_at: claim.created_at,
            resolved_at: None,
            resolution: None,
        };
        state.records.insert(id.0, record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ClaimId) -> Result<Option<ClaimRecord>, ClaimRepositoryError> {
        let state = self.guard()?;
        Ok(state.records.get(&id.0).cloned())
    }

    fn resolve(
        &self,
        id: &ClaimId,
        resolution: String,
        at: DateTime<Utc>,
    ) -> Result<ClaimRecord, ClaimRepositoryError> {
        let mut state = self.guard()?;
        let record = state
            .records
            .get_mut(&id.0)
            .ok_or(ClaimRepositoryError::NotFound)?;

        if record.state != ClaimState::Pending {
            return Err(ClaimRepositoryError::StateConflict);
        }

        record.state = ClaimState::Resolved;
        record.resolved_at = Some(at);
        record.resolution = Some(resolution);
        Ok(record.clone())
    }

    fn all(&self) -> Result<Vec<ClaimRecord>, ClaimRepositoryError> {
        let state = self.guard()?;
        let mut records: Vec<ClaimRecord> = state.records.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
