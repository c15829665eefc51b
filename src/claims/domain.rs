use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::packages::PackageId;

/// Identifier wrapper for filed claims.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimState {
    Pending,
    Resolved,
}

impl ClaimState {
    pub const fn label(self) -> &'static str {
        match self {
            ClaimState::Pending => "pending",
            ClaimState::Resolved => "resolved",
        }
    }
}

/// A resident complaint linked to a package. Mutated exactly once, when a
/// concierge resolves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub id: ClaimId,
    pub package_ref: PackageId,
    pub user_ref: String,
    pub description: String,
    pub state: ClaimState,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}
