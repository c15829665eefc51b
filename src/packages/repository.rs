use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{PackageId, PackageKind, PackageRecord, PackageState};

/// Error enumeration for package store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Uniqueness constraint on the code columns rejected the insert.
    #[error("a package already holds one of the supplied codes")]
    DuplicateCode,
    #[error("package not found")]
    NotFound,
    /// Conditional-write precondition (`state = pending`) did not hold.
    #[error("package is no longer pending")]
    StateConflict,
    #[error("package store unavailable: {0}")]
    Unavailable(String),
}

/// Insert payload; the store assigns the id and the notification defaults.
#[derive(Debug, Clone)]
pub struct NewPackage {
    pub department: String,
    pub kind: PackageKind,
    pub comments: String,
    pub urgent: bool,
    pub tracking_code: String,
    pub retrieval_code: String,
    pub ingested_at: DateTime<Utc>,
}

/// Terminal transition applied atomically, keyed on `state = pending`.
#[derive(Debug, Clone)]
pub enum PendingTransition {
    Withdraw { at: DateTime<Utc>, by: String },
    MarkLost,
}

/// Concierge listing filter. The until bound is inclusive; callers widen a
/// date to end-of-day before passing it here.
#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    pub state: Option<PackageState>,
    pub department: Option<String>,
    pub ingested_from: Option<DateTime<Utc>>,
    pub ingested_until: Option<DateTime<Utc>>,
}

/// Storage abstraction over the package population. Every method is a
/// single atomic read or single-record mutation; there is no multi-record
/// transaction anywhere in the system.
pub trait PackageRepository: Send + Sync {
    /// Insert a new pending package, enforcing uniqueness of both codes
    /// against the full historical population.
    fn insert(&self, package: NewPackage) -> Result<PackageRecord, RepositoryError>;
    fn fetch(&self, id: &PackageId) -> Result<Option<PackageRecord>, RepositoryError>;
    /// True if any package, in any state, holds `code` as either its
    /// tracking or retrieval code. Codes are never reused.
    fn code_in_use(&self, code: &str) -> Result<bool, RepositoryError>;
    /// Conditional state write. `StateConflict` when the record is not
    /// pending, `NotFound` when the id does not resolve.
    fn transition(
        &self,
        id: &PackageId,
        change: PendingTransition,
    ) -> Result<PackageRecord, RepositoryError>;
    fn list(&self, filter: &PackageFilter) -> Result<Vec<PackageRecord>, RepositoryError>;
    fn pending_unnotified(&self, department: &str) -> Result<Vec<PackageRecord>, RepositoryError>;
    fn pending_urgent(&self, department: &str) -> Result<Vec<PackageRecord>, RepositoryError>;
    /// One-shot flag write; already-notified and unknown ids are no-ops.
    fn mark_notified(&self, ids: &[PackageId]) -> Result<(), RepositoryError>;
    fn stamp_reminder(
        &self,
        id: &PackageId,
        at: DateTime<Utc>,
    ) -> Result<PackageRecord, RepositoryError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    sequence: u64,
    records: BTreeMap<String, PackageRecord>,
}

/// In-process package store. The mutex gives every trait method the
/// record-level atomicity the contract requires.
#[derive(Debug, Default)]
pub struct MemoryPackageRepository {
    state: Mutex<MemoryState>,
}

impl MemoryPackageRepository {
    fn guard(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }

    fn code_taken(state: &MemoryState, code: &str) -> bool {
        state
            .records
            .values()
            .any(|record| record.tracking_code == code || record.retrieval_code == code)
    }
}

impl PackageRepository for MemoryPackageRepository {
    fn insert(&self, package: NewPackage) -> Result<PackageRecord, RepositoryError> {
        let mut state = self.guard()?;

        if Self::code_taken(&state, &package.tracking_code)
            || Self::code_taken(&state, &package.retrieval_code)
        {
            return Err(RepositoryError::DuplicateCode);
        }

        state.sequence += 1;
        let id = PackageId(format!("pkg-{:06}", state.sequence));
        let record = PackageRecord {
            id: id.clone(),
            department: package.department,
            kind: package.kind,
            comments: package.comments,
            state: PackageState::Pending,
            urgent: package.urgent,
            tracking_code: package.tracking_code,
            retrieval_code: package.retrieval_code,
            ingested_at: package.ingested_at,
            withdrawn_at: None,
            withdrawn_by: None,
            notified: false,
            last_notified_at: None,
        };
        state.records.insert(id.0, record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &PackageId) -> Result<Option<PackageRecord>, RepositoryError> {
        let state = self.guard()?;
        Ok(state.records.get(&id.0).cloned())
    }

    fn code_in_use(&self, code: &str) -> Result<bool, RepositoryError> {
        let state = self.guard()?;
        Ok(Self::code_taken(&state, code))
    }

    fn transition(
        &self,
        id: &PackageId,
        change: PendingTransition,
    ) -> Result<PackageRecord, RepositoryError> {
        let mut state = self.guard()?;
        let record = state
            .records
            .get_mut(&id.0)
            .ok_or(RepositoryError::NotFound)?;

        if record.state != PackageState::Pending {
            return Err(RepositoryError::StateConflict);
        }

        match change {
            PendingTransition::Withdraw { at, by } => {
                record.state = PackageState::Withdrawn;
                record.withdrawn_at = Some(at);
                record.withdrawn_by = Some(by);
            }
            PendingTransition::MarkLost => {
                record.state = PackageState::Lost;
            }
        }
        Ok(record.clone())
    }

    fn list(&self, filter: &PackageFilter) -> Result<Vec<PackageRecord>, RepositoryError> {
        let state = self.guard()?;
        let mut matches: Vec<PackageRecord> = state
            .records
            .values()
            .filter(|record| {
                filter.state.map_or(true, |wanted| record.state == wanted)
                    && filter
                        .department
                        .as_deref()
                        .map_or(true, |dept| record.department == dept)
                    && filter
                        .ingested_from
                        .map_or(true, |from| record.ingested_at >= from)
                    && filter
                        .ingested_until
                        .map_or(true, |until| record.ingested_at <= until)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.ingested_at.cmp(&a.ingested_at));
        Ok(matches)
    }

    fn pending_unnotified(&self, department: &str) -> Result<Vec<PackageRecord>, RepositoryError> {
        let state = self.guard()?;
        let mut matches: Vec<PackageRecord> = state
            .records
            .values()
            .filter(|record| {
                record.department == department
                    && record.state == PackageState::Pending
                    && !record.notified
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.ingested_at.cmp(&b.ingested_at));
        Ok(matches)
    }

    fn pending_urgent(&self, department: &str) -> Result<Vec<PackageRecord>, RepositoryError> {
        let state = self.guard()?;
        let mut matches: Vec<PackageRecord> = state
            .records
            .values()
            .filter(|record| {
                record.department == department
                    && record.state == PackageState::Pending
                    && record.urgent
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.ingested_at.cmp(&b.ingested_at));
        Ok(matches)
    }

    fn mark_notified(&self, ids: &[PackageId]) -> Result<(), RepositoryError> {
        let mut state = self.guard()?;
        for id in ids {
            if let Some(record) = state.records.get_mut(&id.0) {
                record.notified = true;
            }
        }
        Ok(())
    }

    fn stamp_reminder(
        &self,
        id: &PackageId,
        at: DateTime<Utc>,
    ) -> Result<PackageRecord, RepositoryError> {
        let mut state = self.guard()?;
        let record = state
            .records
            .get_mut(&id.0)
            .ok_or(RepositoryError::NotFound)?;
        record.last_notified_at = Some(at);
        Ok(record.clone())
    }
}
