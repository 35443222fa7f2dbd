//! Forward-only schema upgrades for the settings document.
//!
//! Each step is a pure function over the raw document taking version `n` to
//! `n + 1`. A version bump is only needed when a value moves or is renamed;
//! added fields take their defaults and removed ones are dropped on the next
//! save.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

/// Settings document version written by this build.
pub const CURRENT_SETTINGS_VERSION: u32 = 2;

/// Version assumed for documents that predate the `version` key.
const UNVERSIONED: u32 = 1;

/// A single upgrade step over the raw document.
pub type UpgradeStep = fn(&mut Map<String, Value>);

/// Why a document could not be brought to the current version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpgradeError {
    #[error("Settings document version {found} is newer than supported version {supported}")]
    NewerVersion { found: u32, supported: u32 },

    #[error("No upgrade step registered for settings version {from}")]
    MissingStep { from: u32 },

    #[error("Settings document has an invalid version: {0}")]
    InvalidVersion(String),
}

/// Ordered set of upgrade steps up to a target version.
#[derive(Debug, Clone)]
pub struct UpgradeChain {
    current: u32,
    steps: BTreeMap<u32, UpgradeStep>,
}

impl UpgradeChain {
    /// An empty chain targeting `current`.
    pub fn new(current: u32) -> Self {
        Self {
            current,
            steps: BTreeMap::new(),
        }
    }

    /// The steps shipped with this build.
    pub fn builtin() -> Self {
        Self::new(CURRENT_SETTINGS_VERSION).with_step(1, v1_to_v2)
    }

    /// Register the step taking `from` to `from + 1`.
    #[must_use]
    pub fn with_step(mut self, from: u32, step: UpgradeStep) -> Self {
        self.steps.insert(from, step);
        self
    }

    pub const fn current(&self) -> u32 {
        self.current
    }

    /// Read the declared version of a raw document.
    pub fn version_of(doc: &Map<String, Value>) -> Result<u32, UpgradeError> {
        match doc.get("version") {
            None | Some(Value::Null) => Ok(UNVERSIONED),
            Some(v) => v
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| UpgradeError::InvalidVersion(v.to_string())),
        }
    }

    /// Upgrade `doc` in place. Returns the version it was declared at.
    ///
    /// Every step is checked before any runs, so a missing step leaves the
    /// document untouched.
    pub fn apply(&self, doc: &mut Map<String, Value>) -> Result<u32, UpgradeError> {
        let found = Self::version_of(doc)?;
        if found > self.current {
            return Err(UpgradeError::NewerVersion {
                found,
                supported: self.current,
            });
        }
        if let Some(from) = (found..self.current).find(|v| !self.steps.contains_key(v)) {
            return Err(UpgradeError::MissingStep { from });
        }

        for from in found..self.current {
            if let Some(step) = self.steps.get(&from) {
                step(doc);
            }
            doc.insert("version".to_string(), Value::from(from + 1));
            info!(from, to = from + 1, "Upgraded settings document");
        }
        Ok(found)
    }
}

/// v1 had no `setup` flag; a stored password meant setup was done.
fn v1_to_v2(doc: &mut Map<String, Value>) {
    let has_password = doc
        .get("password_hash")
        .is_some_and(|v| !v.is_null());
    doc.entry("setup").or_insert(Value::Bool(has_password));
}
