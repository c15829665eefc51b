//! Read-only view of the building's resident directory.
//!
//! User records are owned by the identity service; this crate only ever
//! reads them to resolve a human-readable `withdrawn_by` descriptor.

use std::collections::HashMap;
use std::sync::Mutex;

/// Resident entry as exposed by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidentProfile {
    pub user_id: String,
    pub display_name: String,
    pub department: String,
}

impl ResidentProfile {
    /// "Name (dept 101)" descriptor recorded on withdrawal.
    pub fn descriptor(&self) -> String {
        format!("{} (dept {})", self.display_name, self.department)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Lookup seam so the package service can be exercised without the identity
/// service. Department lookup may match several residents; implementations
/// return the first.
pub trait UserDirectory: Send + Sync {
    fn find_by_id(&self, user_id: &str) -> Result<Option<ResidentProfile>, DirectoryError>;
    fn find_by_department(
        &self,
        department: &str,
    ) -> Result<Option<ResidentProfile>, DirectoryError>;
}

/// In-process directory backed by a map, used by the binary and tests.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    residents: Mutex<HashMap<String, ResidentProfile>>,
}

impl MemoryUserDirectory {
    pub fn insert(&self, profile: ResidentProfile) {
        if let Ok(mut residents) = self.residents.lock() {
            residents.insert(profile.user_id.clone(), profile);
        }
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, ResidentProfile>>, DirectoryError> {
        self.residents
            .lock()
            .map_err(|_| DirectoryError::Unavailable("directory lock poisoned".to_string()))
    }
}

impl UserDirectory for MemoryUserDirectory {
    fn find_by_id(&self, user_id: &str) -> Result<Option<ResidentProfile>, DirectoryError> {
        let residents = self.guard()?;
        Ok(residents.get(user_id).cloned())
    }

    fn find_by_department(
        &self,
        department: &str,
    ) -> Result<Option<ResidentProfile>, DirectoryError> {
        let residents = self.guard()?;
        let mut matches: Vec<&ResidentProfile> = residents
            .values()
            .filter(|profile| profile.department == department)
            .collect();
        // Deterministic pick when several residents share a unit.
        matches.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(matches.first().map(|profile| (*profile).clone()))
    }
}
