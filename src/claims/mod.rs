//! Resident complaints linked to packages: filed pending, resolved once.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{ClaimId, ClaimRecord, ClaimState};
pub use repository::{ClaimRepository, ClaimRepositoryError, MemoryClaimRepository, NewClaim};
pub use router::claim_router;
pub use service::{ClaimService, ClaimServiceError};
