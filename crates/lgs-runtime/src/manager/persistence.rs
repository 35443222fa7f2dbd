//! Loading and saving the settings and servers documents.

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;

use lgs_core::{
    CoreError, ManagerSettings, ServerRecord, SettingsLoad, load_servers_document,
    load_settings_document, save_servers_document, save_settings_document,
};
use tracing::{error, info, warn};

use super::ServerManager;

impl ServerManager {
    /// Read the settings document and register the identifiers it maps,
    /// replacing every identifier registered before.
    ///
    /// Without a document every catalogued type registers under its default
    /// identifier. If the document cannot be read the defaults are used
    /// in memory, the error is returned, and saving is disabled so the
    /// unreadable document is not overwritten.
    pub fn load_settings(&self) -> Result<(), CoreError> {
        let path = self.layout.settings_path();
        let loaded = load_settings_document(&path, &self.upgrades);
        self.clear_types();
        match loaded {
            Ok(SettingsLoad::Missing) => {
                info!(path = %path.display(), "No settings document, using defaults");
                self.apply_default_types();
                *self.lock_settings() = ManagerSettings::default();
                self.save_blocked.store(false, Ordering::SeqCst);
                Ok(())
            }
            Ok(SettingsLoad::Loaded {
                settings,
                upgraded_from,
            }) => {
                self.apply_class_map(&settings.class_map);
                *self.lock_settings() = settings;
                self.save_blocked.store(false, Ordering::SeqCst);
                if let Some(from) = upgraded_from {
                    info!(from, to = self.upgrades.current(), "Upgraded settings document");
                    self.save_settings()?;
                }
                Ok(())
            }
            Err(e) => {
                error!(
                    path = %path.display(),
                    error = %e,
                    "Settings document is unreadable, using defaults and leaving it untouched"
                );
                self.apply_default_types();
                *self.lock_settings() = ManagerSettings::default();
                self.save_blocked.store(true, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn apply_default_types(&self) {
        for (identifier, kind) in self.catalog.defaults() {
            if let Err(e) = self.register_type(identifier, std::sync::Arc::clone(kind), false) {
                warn!(identifier, error = %e, "Skipping default job type");
            }
        }
    }

    fn apply_class_map(&self, class_map: &BTreeMap<String, String>) {
        for (identifier, type_name) in class_map {
            let Some(kind) = self.catalog.get(type_name) else {
                warn!(%identifier, %type_name, "Unknown job type in settings, skipping");
                continue;
            };
            if let Err(e) = self.register_type(identifier, kind, true) {
                warn!(%identifier, error = %e, "Could not register job type");
            }
        }
    }

    /// Write the settings document. Returns `Ok(false)` when saving is
    /// disabled after a failed load.
    pub fn save_settings(&self) -> Result<bool, CoreError> {
        if self.save_blocked.load(Ordering::SeqCst) {
            warn!("Not saving settings: the document on disk could not be loaded");
            return Ok(false);
        }
        let mut settings = self.settings();
        settings.version = self.upgrades.current();
        settings.class_map = self
            .registered_types()
            .into_iter()
            .map(|(id, type_name)| (id, type_name.to_string()))
            .collect();
        save_settings_document(&self.layout.settings_path(), &settings)?;
        *self.lock_settings() = settings;
        Ok(true)
    }

    /// Snapshot of the in-memory settings.
    pub fn settings(&self) -> ManagerSettings {
        self.lock_settings().clone()
    }

    /// Whether saving is disabled because the settings document was unreadable.
    pub fn is_save_blocked(&self) -> bool {
        self.save_blocked.load(Ordering::SeqCst)
    }

    /// Store the admin password. Fails with `AlreadyExists` the second time.
    pub fn complete_setup(&self, password: &str) -> Result<(), CoreError> {
        self.lock_settings().complete_setup(password)?;
        info!("First-time setup completed");
        Ok(())
    }

    pub fn verify_password(&self, password: &str) -> bool {
        self.lock_settings().verify_password(password)
    }

    /// Restore every job in the servers document. Returns how many loaded.
    ///
    /// A job that fails to load is logged and skipped; the rest still load.
    pub fn load_servers(&self) -> Result<usize, CoreError> {
        let records = load_servers_document(&self.layout.servers_document_path())?;
        let mut loaded = 0;
        for record in &records {
            match self.load_job(&record.game_type, &record.id, &record.fields) {
                Ok(_) => loaded += 1,
                Err(e) => error!(
                    game_type = %record.game_type,
                    id = %record.id,
                    error = %e,
                    "Failed to load server"
                ),
            }
        }
        info!(loaded, total = records.len(), "Loaded servers");
        Ok(loaded)
    }

    /// Write every live job to the servers document, in registration order.
    pub fn save_servers(&self) -> Result<(), CoreError> {
        let records: Vec<ServerRecord> = self.servers().iter().map(|s| s.record()).collect();
        save_servers_document(&self.layout.servers_document_path(), &records)?;
        info!(count = records.len(), "Saved servers");
        Ok(())
    }
}
