//! Shared fixtures for runtime integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use lgs_core::{EventKind, JobEvent, JobKey, JobStatus, StorageLayout};
use lgs_runtime::{GameServer, ServerManager, TypeCatalog};
use serde_json::{Map, Value};
use tempfile::TempDir;

pub const WAIT: Duration = Duration::from_secs(10);

pub fn manager(dir: &TempDir) -> ServerManager {
    ServerManager::new(StorageLayout::new(dir.path()), TypeCatalog::new())
}

/// Field map from `(name, value)` pairs.
pub fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

/// Status transitions seen on one or more jobs, in publish order.
#[derive(Clone, Default)]
pub struct StatusLog {
    entries: Arc<Mutex<Vec<(JobKey, JobStatus)>>>,
}

impl StatusLog {
    pub fn attach(&self, server: &GameServer) {
        let entries = Arc::clone(&self.entries);
        let key = server.key().clone();
        server.subscribe(
            move |event, _| {
                if let JobEvent::Status { status } = event {
                    entries.lock().unwrap().push((key.clone(), *status));
                }
            },
            Some(EventKind::Status),
        );
    }

    pub fn entries(&self) -> Vec<(JobKey, JobStatus)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<JobStatus> {
        self.entries().into_iter().map(|(_, s)| s).collect()
    }

    pub fn count(&self, status: JobStatus) -> usize {
        self.statuses().into_iter().filter(|s| *s == status).count()
    }
}

/// Poll until `check` holds, panicking after [`WAIT`].
pub async fn eventually(what: &str, check: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
