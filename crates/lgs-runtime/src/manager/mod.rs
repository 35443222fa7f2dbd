//! The orchestrator: job-type resolution, the live job registry and
//! coordinated shutdown.
//!
//! Identifiers map to job types (`minecraft` -> `MinecraftServer`). A job's
//! game type resolves to the longest registered slash-delimited prefix, so
//! `minecraft/paper` uses the `minecraft` type unless `minecraft/paper` is
//! registered itself.

mod persistence;

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use lgs_core::{CoreError, JobKey, JobStatus, ManagerSettings, StorageLayout, UpgradeChain};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::catalog::TypeCatalog;
use crate::game_type::GameType;
use crate::server::GameServer;

/// Owns every live job of one base directory.
pub struct ServerManager {
    layout: Arc<StorageLayout>,
    catalog: TypeCatalog,
    upgrades: UpgradeChain,
    class_map: RwLock<BTreeMap<String, Arc<dyn GameType>>>,
    servers: RwLock<Vec<Arc<GameServer>>>,
    settings: Mutex<ManagerSettings>,
    /// Set while the settings document on disk could not be read.
    save_blocked: AtomicBool,
}

impl std::fmt::Debug for ServerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerManager")
            .field("base_dir", &self.layout.base_dir())
            .field("servers", &self.read_servers().len())
            .finish_non_exhaustive()
    }
}

fn hook_error(key: &JobKey, err: &anyhow::Error) -> CoreError {
    CoreError::Hook {
        job: key.to_string(),
        reason: format!("{err:#}"),
    }
}

impl ServerManager {
    pub fn new(layout: StorageLayout, catalog: TypeCatalog) -> Self {
        Self {
            layout: Arc::new(layout),
            catalog,
            upgrades: UpgradeChain::builtin(),
            class_map: RwLock::new(BTreeMap::new()),
            servers: RwLock::new(Vec::new()),
            settings: Mutex::new(ManagerSettings::default()),
            save_blocked: AtomicBool::new(false),
        }
    }

    /// Replace the settings upgrade chain.
    #[must_use]
    pub fn with_upgrade_chain(mut self, upgrades: UpgradeChain) -> Self {
        self.upgrades = upgrades;
        self
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub const fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    fn read_servers(&self) -> RwLockReadGuard<'_, Vec<Arc<GameServer>>> {
        self.servers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_servers(&self) -> RwLockWriteGuard<'_, Vec<Arc<GameServer>>> {
        self.servers.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_class_map(&self) -> RwLockReadGuard<'_, BTreeMap<String, Arc<dyn GameType>>> {
        self.class_map.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_settings(&self) -> MutexGuard<'_, ManagerSettings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Map `identifier` to a job type.
    ///
    /// Fails with `AlreadyExists` if the identifier is taken and `force` is false.
    pub fn register_type(
        &self,
        identifier: &str,
        kind: Arc<dyn GameType>,
        force: bool,
    ) -> Result<(), CoreError> {
        let mut class_map = self.class_map.write().unwrap_or_else(PoisonError::into_inner);
        if !force && class_map.contains_key(identifier) {
            return Err(CoreError::AlreadyExists(format!(
                "job type identifier {identifier} is already registered"
            )));
        }
        debug!(identifier, type_name = kind.type_name(), "Registered job type");
        class_map.insert(identifier.to_string(), kind);
        Ok(())
    }

    /// Forget every registered identifier.
    fn clear_types(&self) {
        self.class_map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Identifier -> type name for every registered identifier.
    pub fn registered_types(&self) -> BTreeMap<String, &'static str> {
        self.read_class_map()
            .iter()
            .map(|(id, kind)| (id.clone(), kind.type_name()))
            .collect()
    }

    /// Job type for `game_type`: the longest registered slash-delimited
    /// prefix, or the generic type.
    pub fn resolve_type(&self, game_type: &str) -> Arc<dyn GameType> {
        let class_map = self.read_class_map();
        let mut candidate = game_type;
        loop {
            if let Some(kind) = class_map.get(candidate) {
                return Arc::clone(kind);
            }
            match candidate.rfind('/') {
                Some(idx) => candidate = &candidate[..idx],
                None => return self.catalog.generic(),
            }
        }
    }

    /// Create the shared bins every registered type declares.
    pub fn ensure_shared_bins(&self) -> Result<(), CoreError> {
        let class_map = self.read_class_map();
        for (identifier, kind) in class_map.iter() {
            for bin in kind.bins() {
                self.layout.ensure_bin(identifier, bin)?;
            }
        }
        Ok(())
    }

    pub fn get_server(&self, game_type: &str, id: &str) -> Option<Arc<GameServer>> {
        self.read_servers()
            .iter()
            .find(|s| s.key().game_type == game_type && s.key().id == id)
            .cloned()
    }

    /// Every live job, in registration order.
    pub fn servers(&self) -> Vec<Arc<GameServer>> {
        self.read_servers().clone()
    }

    /// Construct a job object, provisioning its directory and running `init`.
    fn construct(&self, key: &JobKey, fields: &Map<String, Value>) -> Result<Arc<GameServer>, CoreError> {
        let kind = self.resolve_type(&key.game_type);
        let server = GameServer::new(key.clone(), kind, Arc::clone(&self.layout));

        match self.layout.allocate_directory(key) {
            Ok(_) => {}
            Err(e) if e.is_already_exists() => {
                debug!(job = %key, "Server directory already provisioned");
            }
            Err(e) => return Err(e),
        }

        server.apply_fields(fields)?;
        server
            .kind()
            .init(&server)
            .map_err(|e| hook_error(key, &e))?;
        Ok(server)
    }

    fn ensure_absent(&self, key: &JobKey) -> Result<(), CoreError> {
        if self.get_server(&key.game_type, &key.id).is_some() {
            return Err(CoreError::AlreadyExists(format!("server {key} already exists")));
        }
        Ok(())
    }

    fn insert(&self, server: Arc<GameServer>) -> Result<Arc<GameServer>, CoreError> {
        let mut servers = self.write_servers();
        if servers.iter().any(|s| s.key() == server.key()) {
            return Err(CoreError::AlreadyExists(format!(
                "server {} already exists",
                server.key()
            )));
        }
        servers.push(Arc::clone(&server));
        Ok(server)
    }

    /// Create a brand-new job and run its type's one-time `setup` hook.
    pub async fn create_job(
        &self,
        game_type: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<Arc<GameServer>, CoreError> {
        let key = JobKey::new(game_type, id);
        self.ensure_absent(&key)?;

        let server = self.construct(&key, fields)?;
        server
            .kind()
            .setup(&server)
            .await
            .map_err(|e| hook_error(&key, &e))?;

        let server = self.insert(server)?;
        info!(job = %key, type_name = server.kind().type_name(), "Created server");
        Ok(server)
    }

    /// Restore a persisted job. `init` runs, `setup` does not.
    pub fn load_job(
        &self,
        game_type: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<Arc<GameServer>, CoreError> {
        let key = JobKey::new(game_type, id);
        self.ensure_absent(&key)?;
        let server = self.construct(&key, fields)?;
        let server = self.insert(server)?;
        debug!(job = %key, "Loaded server");
        Ok(server)
    }

    /// Drop a stopped job from the registry. Its directory stays on disk.
    pub fn remove_server(&self, game_type: &str, id: &str) -> Result<Arc<GameServer>, CoreError> {
        let mut servers = self.write_servers();
        let idx = servers
            .iter()
            .position(|s| s.key().game_type == game_type && s.key().id == id)
            .ok_or_else(|| CoreError::NotFound(format!("server {game_type}:{id}")))?;
        let status = servers[idx].status();
        if status != JobStatus::Stopped {
            return Err(CoreError::InvalidState(format!(
                "server {game_type}:{id} is {}",
                status.as_str()
            )));
        }
        let server = servers.remove(idx);
        info!(job = %server.key(), "Removed server");
        Ok(server)
    }

    /// Start every stopped job with `auto_start` set. Returns how many started.
    pub fn auto_start_all(&self) -> usize {
        let mut started = 0;
        for server in self.servers() {
            if !server.settings().auto_start || server.status() != JobStatus::Stopped {
                continue;
            }
            match server.start() {
                Ok(()) => started += 1,
                Err(e) => error!(job = %server.key(), error = %e, "Auto-start failed"),
            }
        }
        info!(started, "Auto-started servers");
        started
    }

    /// Stop every job, then wait for every process to exit.
    ///
    /// All stop requests go out before the first wait, so the total time is
    /// bounded by the slowest job rather than the sum.
    pub async fn shutdown_all(&self) {
        let servers = self.servers();
        info!(count = servers.len(), "Shutting down all servers");

        for server in &servers {
            if let Err(e) = server.stop().await {
                warn!(job = %server.key(), error = %e, "Stop request failed");
            }
        }
        for server in &servers {
            server.wait_for_exit().await;
        }
        info!("All servers stopped");
    }
}
