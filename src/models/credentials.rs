//! Credential profiles and round-robin rotation
//!
//! A fixed, ordered set of backend accounts is configured at startup. Every
//! failed backend attempt advances the shared rotator so that repeated
//! failures visit each configured profile before one is reused.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// One complete set of backend-account configuration
///
/// Fields are private; profiles are created through deserialization or
/// `CredentialProfile::new` and never mutated after validation, apart from
/// environment overrides applied while the configuration is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CredentialProfile {
    project_id: String,
    location: String,
    key_path: PathBuf,
}

impl CredentialProfile {
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
            key_path: key_path.into(),
        }
    }

    /// Get the backend project identifier
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Get the backend region
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Get the path of the key file holding this profile's credentials
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub(crate) fn set_key_path(&mut self, key_path: PathBuf) {
        self.key_path = key_path;
    }
}

/// Round-robin rotator over credential profiles
///
/// The index is a single atomic counter. Concurrent requests share it, so the
/// profile one request observes may already have been advanced by another
/// request's failure; the read-increment itself is never torn.
#[derive(Debug)]
pub struct CredentialRotator {
    profiles: Vec<CredentialProfile>,
    index: AtomicUsize,
}

impl CredentialRotator {
    /// Create a rotator starting at the first profile
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `profiles` is empty.
    pub fn new(profiles: Vec<CredentialProfile>) -> AppResult<Self> {
        if profiles.is_empty() {
            return Err(AppError::Config(
                "CredentialRotator requires at least one credential profile".to_string(),
            ));
        }

        tracing::info!(
            profile_count = profiles.len(),
            first_project = %profiles[0].project_id(),
            "Credential rotator initialized"
        );

        Ok(Self {
            profiles,
            index: AtomicUsize::new(0),
        })
    }

    /// Profile at the current index
    pub fn current(&self) -> &CredentialProfile {
        &self.profiles[self.current_index()]
    }

    /// Advance to the next profile (wrapping) and return it
    pub fn advance(&self) -> &CredentialProfile {
        let count = self.profiles.len();
        // The closure always returns Some, so both arms carry the previous value.
        let previous = match self
            .index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % count))
        {
            Ok(previous) | Err(previous) => previous,
        };
        let next = (previous + 1) % count;

        tracing::debug!(
            from_project = %self.profiles[previous % count].project_id(),
            to_project = %self.profiles[next].project_id(),
            "Rotated credential profile"
        );

        &self.profiles[next]
    }

    /// Index of the current profile, always in `[0, len)`
    pub fn current_index(&self) -> usize {
        self.index.load(Ordering::Acquire) % self.profiles.len()
    }

    /// Number of configured profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Always false; an empty rotator cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// All configured profiles in rotation order
    pub fn profiles(&self) -> &[CredentialProfile] {
        &self.profiles
    }
}
