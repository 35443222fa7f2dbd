//! Persisted documents.
//!
//! - the settings document: type-identifier map, admin credential, version
//! - the servers document: ordered job records
//! - the forward-only upgrade chain applied to settings on load

mod servers;
mod settings;
mod upgrades;

pub use servers::{ServerRecord, load_servers_document, save_servers_document};
pub use settings::{ManagerSettings, SettingsLoad, load_settings_document, save_settings_document};
pub use upgrades::{CURRENT_SETTINGS_VERSION, UpgradeChain, UpgradeError, UpgradeStep};
