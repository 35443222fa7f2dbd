//! Shared-bin links made through a job.

#![cfg(unix)]

mod common;

use common::{fields, manager};
use lgs_core::{CoreError, EntryKind};
use tempfile::TempDir;

#[tokio::test]
async fn add_and_remove_shared_file() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let server = manager.create_job("mc/paper", "lobby", &fields(&[])).await.unwrap();

    let bin = manager.layout().ensure_bin("mc", "jars").unwrap();
    std::fs::write(bin.join("server.jar"), b"jar").unwrap();

    let link = server.add_shared_file("jars", "server.jar").unwrap();
    assert_eq!(link, server.directory().join("server.jar"));
    assert_eq!(
        std::fs::read_link(&link).unwrap(),
        bin.join("server.jar").canonicalize().unwrap()
    );

    let listing = manager
        .layout()
        .list_server_directory(server.key(), None)
        .unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].name, "server.jar");
    assert_eq!(listing[0].kind, EntryKind::Symlink);

    let again = server.add_shared_file("jars", "server.jar").unwrap_err();
    assert!(again.is_already_exists());

    server.remove_shared_file("server.jar").unwrap();
    assert!(!link.exists());
    assert!(bin.join("server.jar").exists());
}

#[tokio::test]
async fn remove_refuses_regular_files() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let server = manager.create_job("mc", "world", &fields(&[])).await.unwrap();
    std::fs::write(server.directory().join("ops.json"), b"[]").unwrap();

    let err = server.remove_shared_file("ops.json").unwrap_err();
    assert!(matches!(err, CoreError::Integrity(_)));
    assert!(server.directory().join("ops.json").exists());
}

#[tokio::test]
async fn remove_refuses_links_outside_storage() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let server = manager.create_job("mc", "w", &fields(&[])).await.unwrap();

    let outside = dir.path().join("outside.txt");
    std::fs::write(&outside, b"keep me").unwrap();
    let link = server.directory().join("evil");
    std::os::unix::fs::symlink(&outside, &link).unwrap();

    let err = server.remove_shared_file("evil").unwrap_err();
    assert!(matches!(err, CoreError::Integrity(_)));
    assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(std::fs::read(&outside).unwrap(), b"keep me");
}

#[tokio::test]
async fn link_from_another_game_type() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let server = manager.create_job("mc/modded", "pack", &fields(&[])).await.unwrap();
    let libs = manager.layout().ensure_bin("java", "runtimes").unwrap();
    std::fs::create_dir(libs.join("jdk21")).unwrap();

    let link = server
        .link_shared_asset("java", "runtimes", "jdk21", Some("jdk"))
        .unwrap();
    assert!(link.ends_with("jdk"));
    assert!(link.is_dir());
}
