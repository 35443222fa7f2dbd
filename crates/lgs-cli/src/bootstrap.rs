//! CLI bootstrap, the composition root.
//!
//! Job types are registered here, explicitly. The manager loads the
//! settings document first so its identifier map is in place before any
//! persisted server is restored.

use std::path::PathBuf;
use std::sync::Arc;

use lgs_core::StorageLayout;
use lgs_runtime::{ServerManager, TypeCatalog};
use tracing::{info, warn};

use crate::error::CliError;
use crate::parser::Cli;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Managed data directory.
    pub directory: PathBuf,
}

impl CliConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            directory: cli.directory.clone(),
        }
    }
}

/// Composed application context handed to command handlers.
pub struct CliContext {
    pub manager: Arc<ServerManager>,
}

impl CliContext {
    pub fn manager(&self) -> &ServerManager {
        &self.manager
    }
}

/// Job types compiled into this binary.
pub fn builtin_catalog() -> TypeCatalog {
    TypeCatalog::new()
}

/// Build the manager for `config.directory` and restore its state.
///
/// An unreadable settings document is logged and left untouched on disk;
/// the manager continues with defaults and refuses to save settings.
pub fn bootstrap(config: &CliConfig) -> Result<CliContext, CliError> {
    std::fs::create_dir_all(&config.directory)?;
    let layout = StorageLayout::new(&config.directory);
    let manager = ServerManager::new(layout, builtin_catalog());

    if let Err(e) = manager.load_settings() {
        warn!(error = %e, "Continuing with default settings");
    }
    manager.ensure_shared_bins()?;
    let loaded = manager.load_servers()?;
    info!(directory = %config.directory.display(), loaded, "Bootstrap complete");

    Ok(CliContext {
        manager: Arc::new(manager),
    })
}
