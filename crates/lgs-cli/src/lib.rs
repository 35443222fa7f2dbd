//! Operator CLI for lazy_game_servers.
//!
//! `main.rs` is the composition root; everything else lives here so the
//! parser and handlers can be tested without spawning the binary.

#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tempfile as _;

use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
