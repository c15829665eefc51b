//! Caller identity boundary.
//!
//! Session issuance and token validation live in an upstream gateway; by the
//! time a request reaches this service the caller is already authenticated
//! and described by a small set of trusted headers. This module turns those
//! headers into a [`CallerIdentity`] and provides the capability checks the
//! routers run before any core operation executes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub const ROLE_HEADER: &str = "x-user-role";
pub const DEPARTMENT_HEADER: &str = "x-user-department";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const DISPLAY_NAME_HEADER: &str = "x-user-name";

/// Roles recognized by the authorization checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Resident,
    Concierge,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Resident => "resident",
            Role::Concierge => "concierge",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "resident" => Some(Role::Resident),
            "concierge" => Some(Role::Concierge),
            _ => None,
        }
    }
}

/// Authenticated caller as reported by the gateway.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
    pub department: Option<String>,
}

impl CallerIdentity {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let raw_role = header_value(headers, ROLE_HEADER).ok_or(AuthError::MissingIdentity)?;
        let role = Role::parse(&raw_role).ok_or(AuthError::UnknownRole { value: raw_role })?;

        Ok(Self {
            user_id: header_value(headers, USER_ID_HEADER),
            display_name: header_value(headers, DISPLAY_NAME_HEADER),
            role,
            department: header_value(headers, DEPARTMENT_HEADER),
        })
    }

    pub fn require_concierge(&self) -> Result<(), AuthError> {
        if self.role == Role::Concierge {
            Ok(())
        } else {
            Err(AuthError::RoleForbidden {
                required: Role::Concierge,
                actual: self.role,
            })
        }
    }

    pub fn require_resident(&self) -> Result<(), AuthError> {
        if self.role == Role::Resident {
            Ok(())
        } else {
            Err(AuthError::RoleForbidden {
                required: Role::Resident,
                actual: self.role,
            })
        }
    }

    /// Residents may only read notification state for their own unit.
    pub fn require_own_department(&self, department: &str) -> Result<(), AuthError> {
        self.require_resident()?;
        match self.department.as_deref() {
            Some(own) if own == department => Ok(()),
            _ => Err(AuthError::ForeignDepartment),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("caller identity headers are missing")]
    MissingIdentity,
    #[error("unrecognized caller role '{value}'")]
    UnknownRole { value: String },
    #[error("role {} required, caller is {}", required.label(), actual.label())]
    RoleForbidden { required: Role, actual: Role },
    #[error("residents may only query their own department")]
    ForeignDepartment,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingIdentity | AuthError::UnknownRole { .. } => StatusCode::UNAUTHORIZED,
            AuthError::RoleForbidden { .. } | AuthError::ForeignDepartment => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        CallerIdentity::from_headers(&parts.headers)
    }
}
