//! Process supervision and orchestration for lazy_game_servers.
//!
//! This crate turns the pure domain in `lgs-core` into running jobs:
//!
//! - [`GameServer`]: one job's process lifecycle, console capture and events
//! - [`GameType`]: the extension point job types implement
//! - [`TypeCatalog`]: compiled-in job types, registered at startup
//! - [`ServerManager`]: identifier mapping, live registry, persistence and
//!   coordinated shutdown

#![deny(unused_crate_dependencies)]

pub mod catalog;
pub mod game_type;
pub mod manager;
pub mod server;

pub use catalog::TypeCatalog;
pub use game_type::{GENERIC_TYPE_NAME, GameType, GenericServer};
pub use manager::ServerManager;
pub use server::GameServer;

#[cfg(test)]
use tokio_test as _;
