//! A single managed job: settings, console, event bus and process lifecycle.
//!
//! `GameServer` is always held behind an `Arc`. Starting a process spawns
//! reader and exit-waiter tasks that keep a clone until the process is gone.

mod fields;
mod lifecycle;
mod process;
mod stream;

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use lgs_core::{
    Console, CoreError, EventBus, EventKind, JobEvent, JobKey, JobSettings, JobStatus, Listener,
    StorageLayout,
};
use serde_json::{Map, Value};

use crate::game_type::GameType;
use process::ProcessHandle;

use fields::FieldValues;

/// Mutable process state, guarded together so status and handle never drift.
#[derive(Debug, Default)]
struct ProcessState {
    status: JobStatus,
    process: Option<ProcessHandle>,
}

/// One job instance.
pub struct GameServer {
    key: JobKey,
    kind: Arc<dyn GameType>,
    layout: Arc<StorageLayout>,
    directory: PathBuf,
    values: RwLock<FieldValues>,
    state: Mutex<ProcessState>,
    generation: Arc<AtomicU64>,
    console: Console,
    bus: EventBus,
}

impl std::fmt::Debug for GameServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameServer")
            .field("key", &self.key)
            .field("kind", &self.kind.type_name())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl GameServer {
    /// Build a stopped job with the type's defaults. Does not touch the
    /// filesystem and does not run any hook.
    pub fn new(key: JobKey, kind: Arc<dyn GameType>, layout: Arc<StorageLayout>) -> Arc<Self> {
        let directory = layout.server_dir(&key);
        let values = FieldValues::defaults(kind.as_ref());
        Arc::new(Self {
            key,
            kind,
            layout,
            directory,
            values: RwLock::new(values),
            state: Mutex::new(ProcessState::default()),
            generation: Arc::new(AtomicU64::new(0)),
            console: Console::new(),
            bus: EventBus::new(),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, ProcessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub const fn key(&self) -> &JobKey {
        &self.key
    }

    pub fn kind(&self) -> &dyn GameType {
        self.kind.as_ref()
    }

    /// Working directory, `servers/<game_type>/<id>/`.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn status(&self) -> JobStatus {
        self.lock_state().status
    }

    /// OS process id while a process is attached.
    pub fn pid(&self) -> Option<u32> {
        self.lock_state().process.as_ref().and_then(|p| p.pid)
    }

    pub const fn console(&self) -> &Console {
        &self.console
    }

    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Register a listener on this job's bus.
    pub fn subscribe<F>(&self, callback: F, filter: Option<EventKind>) -> Arc<Listener>
    where
        F: Fn(&JobEvent, &Listener) + Send + Sync + 'static,
    {
        self.bus.subscribe(callback, filter)
    }

    /// Publish a type-defined event on this job's bus.
    pub fn emit_custom(&self, payload: Value) {
        self.bus.publish(&JobEvent::Custom(payload));
    }

    /// Identifier the type's shared bins live under.
    fn shared_game_type(&self) -> &str {
        match self.kind.default_identifier() {
            Some(identifier) => identifier,
            None => self
                .key
                .game_type
                .split('/')
                .next()
                .unwrap_or(&self.key.game_type),
        }
    }

    /// Link `storage/<game_type>/<bin>/<file>` from any game type into this
    /// job's directory.
    pub fn link_shared_asset(
        &self,
        source_game_type: &str,
        bin: &str,
        file: &str,
        dest_name: Option<&str>,
    ) -> Result<PathBuf, CoreError> {
        self.layout
            .link_shared_asset(source_game_type, bin, file, &self.key, dest_name)
    }

    /// Link a file from one of this type's own bins.
    pub fn add_shared_file(&self, bin: &str, file: &str) -> Result<PathBuf, CoreError> {
        self.link_shared_asset(self.shared_game_type(), bin, file, None)
    }

    /// Remove a shared-file link from this job's directory.
    pub fn remove_shared_file(&self, file_name: &str) -> Result<(), CoreError> {
        self.layout.unlink_shared_asset(&self.key, file_name)
    }

    /// Current base settings.
    pub fn settings(&self) -> JobSettings {
        self.read_values().base.clone()
    }

    /// Type-specific values that have been set explicitly. Defaults are
    /// filled in by [`GameServer::field`].
    pub fn extra_fields(&self) -> Map<String, Value> {
        self.read_values().extra.clone()
    }
}
