//! Candidate code generation for package intake.
//!
//! Codes are a fixed prefix plus an 8-character random alphanumeric suffix.
//! Uniqueness is enforced elsewhere: the service pre-checks candidates
//! against the store and the store's insert rejects duplicates, so this
//! module only has to draw plausible candidates.

use rand::distr::Alphanumeric;
use rand::Rng;

pub const TRACKING_PREFIX: &str = "ENC-";
pub const RETRIEVAL_PREFIX: &str = "RET-";
pub const SUFFIX_LEN: usize = 8;

/// Attempt bound shared by the pre-check loop and the insert-retry loop.
pub const MAX_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("could not allocate a unique code within {MAX_ATTEMPTS} attempts")]
    Exhausted,
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect()
}

/// Draw a tracking code candidate, `ENC-` prefixed.
pub fn tracking_candidate() -> String {
    format!("{TRACKING_PREFIX}{}", random_suffix())
}

/// Draw a retrieval code candidate, `RET-` prefixed. Retrieval codes are
/// always stored uppercase.
pub fn retrieval_candidate() -> String {
    format!("{RETRIEVAL_PREFIX}{}", random_suffix().to_ascii_uppercase())
}
