//! Poll-driven notification queries.
//!
//! Residents' clients poll two reads: "what arrived that I have not seen"
//! and "which urgent packages are overdue for another nudge". Both are pure
//! reads; the matching acknowledgment writes (`acknowledge`, `stamp_reminder`)
//! are what move the notification state forward, so a crashed client simply
//! sees the same answer again on its next poll.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::ReminderConfig;

use super::domain::{PackageId, PackageRecord};
use super::repository::{PackageRepository, RepositoryError};

/// Tunable thresholds for urgent reminders. Deployment configuration, not a
/// system constant; requests may override it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderPolicy {
    /// How long an urgent package may sit unclaimed before reminders start.
    pub age_threshold: Duration,
    /// Minimum gap between two reminders for the same package.
    pub cooldown: Duration,
}

impl From<ReminderConfig> for ReminderPolicy {
    fn from(config: ReminderConfig) -> Self {
        Self {
            age_threshold: config.age_threshold(),
            cooldown: config.cooldown(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("package not found")]
    NotFound,
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for NotificationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => NotificationError::NotFound,
            other => NotificationError::Repository(other),
        }
    }
}

/// Computes which packages a resident should be told about.
pub struct NotificationEngine<R> {
    repository: Arc<R>,
}

impl<R> NotificationEngine<R>
where
    R: PackageRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Pending packages for the department that were never surfaced. Stable
    /// under repeated calls; only [`acknowledge`](Self::acknowledge) moves a
    /// package out of this set.
    pub fn unnotified(&self, department: &str) -> Result<Vec<PackageRecord>, NotificationError> {
        Ok(self.repository.pending_unnotified(department)?)
    }

    /// Mark the "new package" event as surfaced. Idempotent: duplicate and
    /// overlapping id sets, and ids that no longer exist, are all no-ops.
    pub fn acknowledge(&self, ids: &[PackageId]) -> Result<(), NotificationError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.repository.mark_notified(ids)?;
        Ok(())
    }

    /// Pending urgent packages old enough to nag about and outside their
    /// reminder cooldown window as of `now`.
    pub fn urgent_due(
        &self,
        department: &str,
        policy: ReminderPolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<PackageRecord>, NotificationError> {
        let candidates = self.repository.pending_urgent(department)?;
        Ok(candidates
            .into_iter()
            .filter(|record| Self::due(record, policy, now))
            .collect())
    }

    /// Record that a reminder was actually shown. Called after the client
    /// commits to displaying it; a missed stamp only means the next reminder
    /// arrives sooner than the cooldown intends.
    pub fn stamp_reminder(
        &self,
        id: &PackageId,
        now: DateTime<Utc>,
    ) -> Result<PackageRecord, NotificationError> {
        Ok(self.repository.stamp_reminder(id, now)?)
    }

    fn due(record: &PackageRecord, policy: ReminderPolicy, now: DateTime<Utc>) -> bool {
        if record.ingested_at > now - policy.age_threshold {
            return false;
        }
        match record.last_notified_at {
            None => true,
            Some(last) => last <= now - policy.cooldown,
        }
    }
}
