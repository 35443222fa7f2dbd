//! Settings document: identifier-to-type map and admin credential.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use super::upgrades::{CURRENT_SETTINGS_VERSION, UpgradeChain};
use crate::error::CoreError;
use crate::storage::fs as lfs;

const HASH_SCHEME: &str = "sha256";

/// The persisted manager settings.
///
/// Adding or removing a field does not need a version bump; only moved or
/// renamed values do (see `UpgradeChain`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSettings {
    pub version: u32,
    /// Type identifier -> registered job type name.
    pub class_map: BTreeMap<String, String>,
    pub password_hash: Option<String>,
    /// Whether first-time setup has been completed.
    pub setup: bool,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            version: CURRENT_SETTINGS_VERSION,
            class_map: BTreeMap::new(),
            password_hash: None,
            setup: false,
        }
    }
}

impl ManagerSettings {
    /// Store the admin password and mark setup complete.
    pub fn complete_setup(&mut self, password: &str) -> Result<(), CoreError> {
        if self.setup {
            return Err(CoreError::AlreadyExists(
                "setup has already been completed".to_string(),
            ));
        }
        let salt = Uuid::new_v4().simple().to_string();
        self.password_hash = Some(format!(
            "{HASH_SCHEME}${salt}${}",
            digest(&salt, password)
        ));
        self.setup = true;
        Ok(())
    }

    /// Check `password` against the stored hash.
    pub fn verify_password(&self, password: &str) -> bool {
        let Some(stored) = self.password_hash.as_deref() else {
            return false;
        };
        let mut parts = stored.splitn(3, '$');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(HASH_SCHEME), Some(salt), Some(expected)) => digest(salt, password) == expected,
            _ => false,
        }
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Outcome of reading the settings document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsLoad {
    /// No document on disk.
    Missing,
    /// Parsed and, if needed, upgraded to the current version.
    Loaded {
        settings: ManagerSettings,
        /// The version declared on disk when it differed from the current one.
        upgraded_from: Option<u32>,
    },
}

/// Read and upgrade the settings document at `path`.
pub fn load_settings_document(
    path: &Path,
    chain: &UpgradeChain,
) -> Result<SettingsLoad, CoreError> {
    let Some(content) = lfs::read_optional(path)? else {
        return Ok(SettingsLoad::Missing);
    };

    let raw: Value = serde_json::from_str(&content)?;
    let Value::Object(mut doc) = raw else {
        return Err(CoreError::Serialization(format!(
            "{} is not a JSON object",
            path.display()
        )));
    };

    let found = chain.apply(&mut doc)?;
    let mut settings: ManagerSettings = serde_json::from_value(Value::Object(doc))?;
    settings.version = chain.current();

    Ok(SettingsLoad::Loaded {
        settings,
        upgraded_from: (found != chain.current()).then_some(found),
    })
}

/// Write the settings document atomically.
pub fn save_settings_document(path: &Path, settings: &ManagerSettings) -> Result<(), CoreError> {
    let json = serde_json::to_vec_pretty(settings)?;
    lfs::write_atomic(path, &json)
}
