use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{AuthError, CallerIdentity};
use crate::users::UserDirectory;

use super::domain::{IntakeRequest, PackageId, PackageState};
use super::notifications::{NotificationEngine, ReminderPolicy};
use super::repository::{PackageFilter, PackageRepository};
use super::service::{PackageService, PackageServiceError};

/// Shared state for the package endpoints.
pub struct PackageRoutes<R, D> {
    pub service: Arc<PackageService<R, D>>,
    pub notifications: Arc<NotificationEngine<R>>,
    pub default_policy: ReminderPolicy,
}

impl<R, D> Clone for PackageRoutes<R, D> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            notifications: self.notifications.clone(),
            default_policy: self.default_policy,
        }
    }
}

/// Router builder exposing intake, lifecycle, and notification endpoints.
pub fn package_router<R, D>(state: PackageRoutes<R, D>) -> Router
where
    R: PackageRepository + 'static,
    D: UserDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/packages",
            post(register_handler::<R, D>).get(list_handler::<R, D>),
        )
        .route("/api/v1/packages/:package_id", get(get_handler::<R, D>))
        .route(
            "/api/v1/packages/:package_id/withdraw",
            post(withdraw_handler::<R, D>),
        )
        .route(
            "/api/v1/packages/:package_id/lost",
            post(mark_lost_handler::<R, D>),
        )
        .route(
            "/api/v1/packages/:package_id/reminder",
            post(stamp_reminder_handler::<R, D>),
        )
        .route(
            "/api/v1/notifications/:department/unnotified",
            get(unnotified_handler::<R, D>),
        )
        .route(
            "/api/v1/notifications/:department/urgent-due",
            get(urgent_due_handler::<R, D>),
        )
        .route(
            "/api/v1/notifications/acknowledge",
            post(acknowledge_handler::<R, D>),
        )
        .with_state(state)
}

fn error_response(error: PackageServiceError) -> Response {
    let status = match &error {
        PackageServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        PackageServiceError::NotFound => StatusCode::NOT_FOUND,
        PackageServiceError::InvalidState => StatusCode::CONFLICT,
        PackageServiceError::Allocation(_) => StatusCode::SERVICE_UNAVAILABLE,
        PackageServiceError::Repository(_) | PackageServiceError::Directory(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let body = Json(json!({ "error": error.to_string() }));
    (status, body).into_response()
}

pub(crate) async fn register_handler<R, D>(
    State(routes): State<PackageRoutes<R, D>>,
    identity: CallerIdentity,
    Json(request): Json<IntakeRequest>,
) -> Response
where
    R: PackageRepository + 'static,
    D: UserDirectory + 'static,
{
    if let Err(err) = identity.require_concierge() {
        return err.into_response();
    }

    match routes.service.register(request, Utc::now()) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    state: Option<String>,
    department: Option<String>,
    from: Option<NaiveDate>,
    until: Option<NaiveDate>,
}

pub(crate) async fn list_handler<R, D>(
    State(routes): State<PackageRoutes<R, D>>,
    identity: CallerIdentity,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: PackageRepository + 'static,
    D: UserDirectory + 'static,
{
    if let Err(err) = identity.require_concierge() {
        return err.into_response();
    }

    let state = match query.state.as_deref() {
        None => None,
        Some(raw) => match PackageState::parse(raw) {
            Some(parsed) => Some(parsed),
            None => {
                let body = Json(json!({ "error": format!("unknown state filter '{raw}'") }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
        },
    };

    let filter = PackageFilter {
        state,
        department: query.department,
        ingested_from: query
            .from
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc()),
        // Inclusive day window: widen the until bound to end-of-day.
        ingested_until: query
            .until
            .and_then(|date| date.and_hms_milli_opt(23, 59, 59, 999))
            .map(|naive| naive.and_utc()),
    };

    match routes.service.list(&filter) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_handler<R, D>(
    State(routes): State<PackageRoutes<R, D>>,
    identity: CallerIdentity,
    Path(package_id): Path<String>,
) -> Response
where
    R: PackageRepository + 'static,
    D: UserDirectory + 'static,
{
    if let Err(err) = identity.require_concierge() {
        return err.into_response();
    }

    match routes.service.get(&PackageId(package_id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn withdraw_handler<R, D>(
    State(routes): State<PackageRoutes<R, D>>,
    identity: CallerIdentity,
    Path(package_id): Path<String>,
) -> Response
where
    R: PackageRepository + 'static,
    D: UserDirectory + 'static,
{
    if let Err(err) = identity.require_concierge() {
        return err.into_response();
    }

    match routes
        .service
        .withdraw(&PackageId(package_id), &identity, Utc::now())
    {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn mark_lost_handler<R, D>(
    State(routes): State<PackageRoutes<R, D>>,
    identity: CallerIdentity,
    Path(package_id): Path<String>,
) -> Response
where
    R: PackageRepository + 'static,
    D: UserDirectory + 'static,
{
    if let Err(err) = identity.require_concierge() {
        return err.into_response();
    }

    match routes.service.mark_lost(&PackageId(package_id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn unnotified_handler<R, D>(
    State(routes): State<PackageRoutes<R, D>>,
    identity: CallerIdentity,
    Path(department): Path<String>,
) -> Response
where
    R: PackageRepository + 'static,
    D: UserDirectory + 'static,
{
    if let Err(err) = identity.require_own_department(&department) {
        return err.into_response();
    }

    match routes.notifications.unnotified(&department) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(error) => {
            let body = Json(json!({ "error": error.to_string() }));
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReminderQuery {
    age_hours: Option<i64>,
    cooldown_hours: Option<i64>,
}

/// Overrides must be a non-negative hour count that chrono can represent.
fn reminder_override(hours: i64) -> Option<chrono::Duration> {
    if hours < 0 {
        return None;
    }
    chrono::Duration::try_hours(hours)
}

fn override_rejection(name: &str, hours: i64) -> Response {
    let body = Json(json!({
        "error": format!("{name} must be a representable non-negative hour count, got {hours}"),
    }));
    (StatusCode::BAD_REQUEST, body).into_response()
}

pub(crate) async fn urgent_due_handler<R, D>(
    State(routes): State<PackageRoutes<R, D>>,
    identity: CallerIdentity,
    Path(department): Path<String>,
    Query(query): Query<ReminderQuery>,
) -> Response
where
    R: PackageRepository + 'static,
    D: UserDirectory + 'static,
{
    if let Err(err) = identity.require_own_department(&department) {
        return err.into_response();
    }

    let mut policy = routes.default_policy;
    if let Some(hours) = query.age_hours {
        match reminder_override(hours) {
            Some(duration) => policy.age_threshold = duration,
            None => return override_rejection("age_hours", hours),
        }
    }
    if let Some(hours) = query.cooldown_hours {
        match reminder_override(hours) {
            Some(duration) => policy.cooldown = duration,
            None => return override_rejection("cooldown_hours", hours),
        }
    }

    match routes
        .notifications
        .urgent_due(&department, policy, Utc::now())
    {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(error) => {
            let body = Json(json!({ "error": error.to_string() }));
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AcknowledgeRequest {
    package_ids: Vec<String>,
}

pub(crate) async fn acknowledge_handler<R, D>(
    State(routes): State<PackageRoutes<R, D>>,
    identity: CallerIdentity,
    Json(request): Json<AcknowledgeRequest>,
) -> Response
where
    R: PackageRepository + 'static,
    D: UserDirectory + 'static,
{
    if let Err(err) = identity.require_resident() {
        return err.into_response();
    }
    let Some(department) = identity.department.as_deref() else {
        return AuthError::MissingIdentity.into_response();
    };

    let ids: Vec<PackageId> = request.package_ids.into_iter().map(PackageId).collect();
    // Acknowledgment only moves notification state for the caller's own
    // unit; ids that never resolved stay a no-op.
    for id in &ids {
        match routes.service.get(id) {
            Ok(record) if record.department != department => {
                return AuthError::ForeignDepartment.into_response();
            }
            Ok(_) => {}
            Err(PackageServiceError::NotFound) => {}
            Err(error) => return error_response(error),
        }
    }

    match routes.notifications.acknowledge(&ids) {
        Ok(()) => {
            let body = Json(json!({ "acknowledged": ids.len() }));
            (StatusCode::OK, body).into_response()
        }
        Err(error) => {
            let body = Json(json!({ "error": error.to_string() }));
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}

pub(crate) async fn stamp_reminder_handler<R, D>(
    State(routes): State<PackageRoutes<R, D>>,
    identity: CallerIdentity,
    Path(package_id): Path<String>,
) -> Response
where
    R: PackageRepository + 'static,
    D: UserDirectory + 'static,
{
    if let Err(err) = identity.require_resident() {
        return err.into_response();
    }
    let Some(department) = identity.department.as_deref() else {
        return AuthError::MissingIdentity.into_response();
    };

    let id = PackageId(package_id);
    match routes.service.get(&id) {
        Ok(record) if record.department != department => {
            return AuthError::ForeignDepartment.into_response();
        }
        Ok(_) => {}
        Err(error) => return error_response(error),
    }

    match routes.notifications.stamp_reminder(&id, Utc::now()) {
        Ok(record) => {
            let body = Json(json!({
                "package_id": record.id.0,
                "last_notified_at": record.last_notified_at,
            }));
            (StatusCode::OK, body).into_response()
        }
        Err(super::notifications::NotificationError::NotFound) => {
            let body = Json(json!({ "error": "package not found" }));
            (StatusCode::NOT_FOUND, body).into_response()
        }
        Err(error) => {
            let body = Json(json!({ "error": error.to_string() }));
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}
