//! Settings and servers documents through the orchestrator.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{fields, manager};
use lgs_core::{CURRENT_SETTINGS_VERSION, CoreError, StorageLayout, UpgradeError};
use lgs_runtime::{GameType, ServerManager, TypeCatalog};
use serde_json::{Value, json};
use tempfile::TempDir;

struct Minecraft;

#[async_trait]
impl GameType for Minecraft {
    fn type_name(&self) -> &'static str {
        "MinecraftServer"
    }

    fn default_identifier(&self) -> Option<&'static str> {
        Some("minecraft")
    }

    fn startup_command(&self) -> &'static str {
        "java -jar server.jar nogui"
    }

    fn bins(&self) -> &'static [&'static str] {
        &["jars"]
    }
}

fn minecraft_manager(dir: &TempDir) -> ServerManager {
    ServerManager::new(
        StorageLayout::new(dir.path()),
        TypeCatalog::new().with(Minecraft),
    )
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn servers_round_trip_preserves_order_and_fields() {
    let dir = TempDir::new().unwrap();
    {
        let manager = manager(&dir);
        for (id, auto_start) in [("zeta", true), ("alpha", false), ("mid", true)] {
            manager
                .create_job(
                    "test/sub",
                    id,
                    &fields(&[
                        ("startup_command", format!("./run {id}").into()),
                        ("auto_start", auto_start.into()),
                    ]),
                )
                .await
                .unwrap();
        }
        manager.save_servers().unwrap();
    }

    let manager = manager(&dir);
    assert_eq!(manager.load_servers().unwrap(), 3);
    let servers = manager.servers();
    let ids: Vec<&str> = servers.iter().map(|s| s.key().id.as_str()).collect();
    assert_eq!(ids, ["zeta", "alpha", "mid"]);

    let alpha = manager.get_server("test/sub", "alpha").unwrap();
    assert_eq!(alpha.settings().startup_command, "./run alpha");
    assert!(!alpha.settings().auto_start);
    assert!(manager.get_server("test/sub", "zeta").unwrap().settings().auto_start);
}

#[test]
fn missing_servers_document_means_no_jobs() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    assert_eq!(manager.load_servers().unwrap(), 0);
    assert!(manager.servers().is_empty());
}

#[test]
fn missing_settings_register_default_identifiers() {
    let dir = TempDir::new().unwrap();
    let manager = minecraft_manager(&dir);
    manager.load_settings().unwrap();
    assert_eq!(manager.registered_types()["minecraft"], "MinecraftServer");

    manager.ensure_shared_bins().unwrap();
    assert!(dir.path().join("storage/minecraft/jars").is_dir());

    assert!(manager.save_settings().unwrap());
    let doc = read_json(&dir.path().join("settings.json"));
    assert_eq!(doc["version"], CURRENT_SETTINGS_VERSION);
    assert_eq!(doc["class_map"]["minecraft"], "MinecraftServer");
}

#[test]
fn old_settings_are_upgraded_and_rewritten() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        json!({
            "version": 1,
            "class_map": {"mc": "MinecraftServer"},
            "password_hash": "sha256$salt$00"
        })
        .to_string(),
    )
    .unwrap();

    let manager = minecraft_manager(&dir);
    manager.load_settings().unwrap();
    assert!(manager.settings().setup);
    assert_eq!(manager.registered_types()["mc"], "MinecraftServer");

    let doc = read_json(&path);
    assert_eq!(doc["version"], CURRENT_SETTINGS_VERSION);
    assert_eq!(doc["setup"], true);
}

#[test]
fn newer_settings_are_never_overwritten() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    let original = json!({"version": CURRENT_SETTINGS_VERSION + 1, "class_map": {}}).to_string();
    std::fs::write(&path, &original).unwrap();

    let manager = minecraft_manager(&dir);
    let err = manager.load_settings().unwrap_err();
    assert!(matches!(
        err,
        CoreError::ConfigVersion(UpgradeError::NewerVersion { .. })
    ));
    assert!(manager.is_save_blocked());
    assert_eq!(manager.registered_types()["minecraft"], "MinecraftServer");

    assert!(!manager.save_settings().unwrap());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn valid_reload_replaces_fallback_identifiers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();

    let manager = minecraft_manager(&dir);
    assert!(manager.load_settings().is_err());
    assert!(manager.registered_types().contains_key("minecraft"));

    std::fs::write(
        &path,
        json!({
            "version": CURRENT_SETTINGS_VERSION,
            "class_map": {"mc": "MinecraftServer"}
        })
        .to_string(),
    )
    .unwrap();
    manager.load_settings().unwrap();
    assert!(!manager.is_save_blocked());

    let types = manager.registered_types();
    assert_eq!(types.len(), 1);
    assert_eq!(types["mc"], "MinecraftServer");

    assert!(manager.save_settings().unwrap());
    let doc = read_json(&path);
    assert_eq!(doc["class_map"], json!({"mc": "MinecraftServer"}));
}

#[test]
fn unknown_type_names_are_skipped() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("settings.json"),
        json!({
            "version": CURRENT_SETTINGS_VERSION,
            "class_map": {"minecraft": "MinecraftServer", "factorio": "FactorioServer"}
        })
        .to_string(),
    )
    .unwrap();

    let manager = minecraft_manager(&dir);
    manager.load_settings().unwrap();
    let types = manager.registered_types();
    assert_eq!(types.len(), 1);
    assert!(types.contains_key("minecraft"));
}

#[test]
fn setup_survives_a_reload() {
    let dir = TempDir::new().unwrap();
    {
        let manager = minecraft_manager(&dir);
        manager.load_settings().unwrap();
        manager.complete_setup("hunter2").unwrap();
        assert!(manager.complete_setup("again").unwrap_err().is_already_exists());
        manager.save_settings().unwrap();
    }

    let manager = minecraft_manager(&dir);
    manager.load_settings().unwrap();
    assert!(manager.verify_password("hunter2"));
    assert!(!manager.verify_password("hunter3"));
}

#[tokio::test]
async fn created_job_resolves_registered_type() {
    let dir = TempDir::new().unwrap();
    let manager = minecraft_manager(&dir);
    manager.load_settings().unwrap();
    manager
        .register_type("minecraft/legacy", Arc::new(lgs_runtime::GenericServer), false)
        .unwrap();

    let paper = manager.create_job("minecraft/paper", "a", &fields(&[])).await.unwrap();
    assert_eq!(paper.kind().type_name(), "MinecraftServer");
    assert_eq!(
        paper.settings().startup_command,
        "java -jar server.jar nogui"
    );

    let legacy = manager.create_job("minecraft/legacy", "b", &fields(&[])).await.unwrap();
    assert_eq!(legacy.kind().type_name(), "GameServer");
}
