use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::auth::{CallerIdentity, Role};
use crate::packages::domain::{IntakeRequest, PackageId, PackageKind, PackageRecord};
use crate::packages::notifications::{NotificationEngine, ReminderPolicy};
use crate::packages::repository::{
    MemoryPackageRepository, NewPackage, PackageFilter, PackageRepository, PendingTransition,
    RepositoryError,
};
use crate::packages::router::{package_router, PackageRoutes};
use crate::packages::service::PackageService;
use crate::users::{MemoryUserDirectory, ResidentProfile};

pub(super) fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn intake(department: &str, kind: &str) -> IntakeRequest {
    IntakeRequest {
        department: department.to_string(),
        kind: kind.to_string(),
        comments: Some("leave at the desk".to_string()),
        urgent: false,
        tracking_code: None,
    }
}

pub(super) fn urgent_intake(department: &str) -> IntakeRequest {
    IntakeRequest {
        urgent: true,
        ..intake(department, "food")
    }
}

pub(super) fn concierge() -> CallerIdentity {
    CallerIdentity {
        user_id: None,
        display_name: Some("Front Desk".to_string()),
        role: Role::Concierge,
        department: None,
    }
}

pub(super) fn resident(user_id: &str, department: &str) -> CallerIdentity {
    CallerIdentity {
        user_id: Some(user_id.to_string()),
        display_name: Some("Resident".to_string()),
        role: Role::Resident,
        department: Some(department.to_string()),
    }
}

pub(super) fn build_service() -> (
    Arc<MemoryPackageRepository>,
    Arc<MemoryUserDirectory>,
    PackageService<MemoryPackageRepository, MemoryUserDirectory>,
) {
    let repository = Arc::new(MemoryPackageRepository::default());
    let directory = Arc::new(MemoryUserDirectory::default());
    let service = PackageService::new(repository.clone(), directory.clone());
    (repository, directory, service)
}

pub(super) fn seed_resident(directory: &MemoryUserDirectory, user_id: &str, department: &str) {
    directory.insert(ResidentProfile {
        user_id: user_id.to_string(),
        display_name: format!("Resident {user_id}"),
        department: department.to_string(),
    });
}

/// Insert a backdated urgent package directly through the store, bypassing
/// intake, so reminder-age scenarios can control `ingested_at`.
pub(super) fn seed_urgent(
    repository: &MemoryPackageRepository,
    department: &str,
    ingested_at: DateTime<Utc>,
) -> PackageRecord {
    repository
        .insert(NewPackage {
            department: department.to_string(),
            kind: PackageKind::Food,
            comments: String::new(),
            urgent: true,
            tracking_code: format!("ENC-SEED{:04}", seed_serial()),
            retrieval_code: format!("RET-SEED{:04}", seed_serial()),
            ingested_at,
        })
        .expect("seed insert succeeds")
}

fn seed_serial() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};
    static SERIAL: AtomicU32 = AtomicU32::new(0);
    SERIAL.fetch_add(1, Ordering::Relaxed)
}

pub(super) fn build_routes() -> (
    Arc<MemoryPackageRepository>,
    Arc<MemoryUserDirectory>,
    PackageRoutes<MemoryPackageRepository, MemoryUserDirectory>,
) {
    let (repository, directory, service) = build_service();
    let routes = PackageRoutes {
        service: Arc::new(service),
        notifications: Arc::new(NotificationEngine::new(repository.clone())),
        default_policy: ReminderPolicy {
            age_threshold: chrono::Duration::hours(12),
            cooldown: chrono::Duration::hours(12),
        },
    };
    (repository, directory, routes)
}

pub(super) fn router_for(
    routes: PackageRoutes<MemoryPackageRepository, MemoryUserDirectory>,
) -> axum::Router {
    package_router(routes)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    assert!(
        response.status() != StatusCode::UNSUPPORTED_MEDIA_TYPE,
        "handler rejected the content type"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

/// Store whose insert always reports a code collision, exercising the
/// bounded insert-retry path.
#[derive(Debug, Default)]
pub(super) struct CollidingRepository;

impl PackageRepository for CollidingRepository {
    fn insert(&self, _package: NewPackage) -> Result<PackageRecord, RepositoryError> {
        Err(RepositoryError::DuplicateCode)
    }

    fn fetch(&self, _id: &PackageId) -> Result<Option<PackageRecord>, RepositoryError> {
        Ok(None)
    }

    fn code_in_use(&self, _code: &str) -> Result<bool, RepositoryError> {
        Ok(false)
    }

    fn transition(
        &self,
        _id: &PackageId,
        _change: PendingTransition,
    ) -> Result<PackageRecord, RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    fn list(&self, _filter: &PackageFilter) -> Result<Vec<PackageRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn pending_unnotified(&self, _department: &str) -> Result<Vec<PackageRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn pending_urgent(&self, _department: &str) -> Result<Vec<PackageRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn mark_notified(&self, _ids: &[PackageId]) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn stamp_reminder(
        &self,
        _id: &PackageId,
        _at: DateTime<Utc>,
    ) -> Result<PackageRecord, RepositoryError> {
        Err(RepositoryError::NotFound)
    }
}

/// Store where every drawn code already exists, exercising the pre-check
/// exhaustion path.
#[derive(Debug, Default)]
pub(super) struct SaturatedRepository;

impl PackageRepository for SaturatedRepository {
    fn insert(&self, _package: NewPackage) -> Result<PackageRecord, RepositoryError> {
        Err(RepositoryError::DuplicateCode)
    }

    fn fetch(&self, _id: &PackageId) -> Result<Option<PackageRecord>, RepositoryError> {
        Ok(None)
    }

    fn code_in_use(&self, _code: &str) -> Result<bool, RepositoryError> {
        Ok(true)
    }

    fn transition(
        &self,
        _id: &PackageId,
        _change: PendingTransition,
    ) -> Result<PackageRecord, RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    fn list(&self, _filter: &PackageFilter) -> Result<Vec<PackageRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn pending_unnotified(&self, _department: &str) -> Result<Vec<PackageRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn pending_urgent(&self, _department: &str) -> Result<Vec<PackageRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn mark_notified(&self, _ids: &[PackageId]) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn stamp_reminder(
        &self,
        _id: &PackageId,
        _at: DateTime<Utc>,
    ) -> Result<PackageRecord, RepositoryError> {
        Err(RepositoryError::NotFound)
    }
}
