//! Core domain types for lazy-game-servers.
//!
//! This crate holds everything about supervised game servers that does not
//! touch a child process directly:
//!
//! - [`domain`] - job identity, lifecycle status, base settings and the console
//! - [`events`] - the per-job synchronous event bus
//! - [`fields`] - the static settings-field schema used for generic serialization
//! - [`template`] - startup command rendering
//! - [`storage`] - the filesystem wrapper and the resource registry
//! - [`documents`] - persisted settings/servers documents and the upgrade chain
//!
//! Process supervision and orchestration live in `lgs-runtime`.

#![deny(unused_crate_dependencies)]

pub mod documents;
pub mod domain;
pub mod error;
pub mod events;
pub mod fields;
pub mod storage;
pub mod template;

pub use documents::{
    CURRENT_SETTINGS_VERSION, ManagerSettings, ServerRecord, SettingsLoad, UpgradeChain,
    UpgradeError, load_servers_document, load_settings_document, save_servers_document,
    save_settings_document,
};
pub use domain::{Console, ConsoleLine, JobKey, JobSettings, JobStatus, StopCommand};
pub use error::CoreError;
pub use events::{EventBus, EventKind, JobEvent, Listener};
pub use fields::{BASE_FIELDS, FieldDefault, FieldDescriptor, FieldFlags, FieldKind};
pub use storage::{DirEntryInfo, EntryKind, StorageLayout};
pub use template::{TemplateError, render_command, split_command_line};

// Silence unused dev-dependency warnings for crates only used by some test modules
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;
