//! Servers document: the ordered list of persisted jobs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::domain::JobKey;
use crate::error::CoreError;
use crate::storage::fs as lfs;

/// One persisted job: its identity plus its persisted settings fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    #[serde(rename = "type")]
    pub game_type: String,
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ServerRecord {
    pub fn new(key: &JobKey, fields: Map<String, Value>) -> Self {
        Self {
            game_type: key.game_type.clone(),
            id: key.id.clone(),
            fields,
        }
    }

    pub fn key(&self) -> JobKey {
        JobKey::new(&self.game_type, &self.id)
    }
}

/// Read the servers document. A missing or empty file means no jobs.
pub fn load_servers_document(path: &Path) -> Result<Vec<ServerRecord>, CoreError> {
    let Some(content) = lfs::read_optional(path)? else {
        return Ok(Vec::new());
    };
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Option<Vec<ServerRecord>> = serde_json::from_str(&content)?;
    Ok(records.unwrap_or_default())
}

/// Write the servers document atomically, preserving record order.
pub fn save_servers_document(path: &Path, records: &[ServerRecord]) -> Result<(), CoreError> {
    let json = serde_json::to_vec_pretty(records)?;
    lfs::write_atomic(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn record_flattens_fields() {
        let mut fields = Map::new();
        fields.insert("max_ram".into(), json!(4096));
        let record = ServerRecord::new(&JobKey::new("minecraft", "smp"), fields);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"type": "minecraft", "id": "smp", "max_ram": 4096}));
    }

    #[test]
    fn missing_or_null_document_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("servers.json");
        assert!(load_servers_document(&path).unwrap().is_empty());

        std::fs::write(&path, "null").unwrap();
        assert!(load_servers_document(&path).unwrap().is_empty());
    }

    #[test]
    fn malformed_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("servers.json");
        std::fs::write(&path, "[{\"id\": 3}]").unwrap();
        assert!(matches!(
            load_servers_document(&path),
            Err(CoreError::Serialization(_))
        ));
    }
}
