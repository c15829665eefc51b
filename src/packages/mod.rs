//! Package lifecycle: intake with collision-free code allocation, the
//! pending/withdrawn/lost state machine, and the poll-driven notification
//! queries residents use to learn about new and unclaimed-urgent packages.

pub mod codes;
pub mod domain;
pub mod notifications;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use codes::{AllocationError, MAX_ATTEMPTS, RETRIEVAL_PREFIX, TRACKING_PREFIX};
pub use domain::{
    IntakeRequest, PackageId, PackageKind, PackageRecord, PackageState, ValidationError,
    UNKNOWN_WITHDRAWER,
};
pub use notifications::{NotificationEngine, NotificationError, ReminderPolicy};
pub use repository::{
    MemoryPackageRepository, NewPackage, PackageFilter, PackageRepository, PendingTransition,
    RepositoryError,
};
pub use router::{package_router, PackageRoutes};
pub use service::{PackageService, PackageServiceError};
