use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{AuthError, CallerIdentity};
use crate::packages::PackageId;

use super::domain::ClaimId;
use super::repository::ClaimRepository;
use super::service::{ClaimService, ClaimServiceError};

/// Router builder for claim filing and resolution.
pub fn claim_router<R>(service: Arc<ClaimService<R>>) -> Router
where
    R: ClaimRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/claims",
            post(file_handler::<R>).get(list_handler::<R>),
        )
        .route("/api/v1/claims/:claim_id/resolve", post(resolve_handler::<R>))
        .with_state(service)
}

fn error_response(error: ClaimServiceError) -> Response {
    let status = match &error {
        ClaimServiceError::InvalidInput => StatusCode::BAD_REQUEST,
        ClaimServiceError::NotFound => StatusCode::NOT_FOUND,
        ClaimServiceError::InvalidState => StatusCode::CONFLICT,
        ClaimServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = Json(json!({ "error": error.to_string() }));
    (status, body).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileClaimRequest {
    package_id: String,
    description: String,
}

pub(crate) async fn file_handler<R>(
    State(service): State<Arc<ClaimService<R>>>,
    identity: CallerIdentity,
    Json(request): Json<FileClaimRequest>,
) -> Response
where
    R: ClaimRepository + 'static,
{
    if let Err(err) = identity.require_resident() {
        return err.into_response();
    }
    // Claims are always filed as the authenticated resident, never on
    // someone else's behalf.
    let Some(user_ref) = identity.user_id.as_deref() else {
        return AuthError::MissingIdentity.into_response();
    };

    match service.file(
        PackageId(request.package_id),
        user_ref,
        &request.description,
        Utc::now(),
    ) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<ClaimService<R>>>,
    identity: CallerIdentity,
) -> Response
where
    R: ClaimRepository + 'static,
{
    if let Err(err) = identity.require_concierge() {
        return err.into_response();
    }

    match service.list() {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolveClaimRequest {
    resolution: String,
}

pub(crate) async fn resolve_handler<R>(
    State(service): State<Arc<ClaimService<R>>>,
    identity: CallerIdentity,
    Path(claim_id): Path<String>,
    Json(request): Json<ResolveClaimRequest>,
) -> Response
where
    R: ClaimRepository + 'static,
{
    if let Err(err) = identity.require_concierge() {
        return err.into_response();
    }

    match service.resolve(&ClaimId(claim_id), &request.resolution, Utc::now()) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}
