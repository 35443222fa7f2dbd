//! Job-type extension point.
//!
//! A job type supplies the defaults and hooks for one kind of game server.
//! Types are registered explicitly at startup (see `TypeCatalog`); nothing
//! is discovered or loaded dynamically.

use async_trait::async_trait;
use lgs_core::{FieldDescriptor, StopCommand};

use crate::server::GameServer;

/// Behaviour and defaults shared by every job of one type.
///
/// # Example
///
/// ```ignore
/// struct Terraria;
///
/// #[async_trait]
/// impl GameType for Terraria {
///     fn type_name(&self) -> &'static str { "TerrariaServer" }
///     fn default_identifier(&self) -> Option<&'static str> { Some("terraria") }
///     fn startup_command(&self) -> &'static str { "./TerrariaServer -world {world}" }
///     fn stop_command(&self) -> StopCommand { StopCommand::console("exit") }
///     fn fields(&self) -> &'static [FieldDescriptor] { TERRARIA_FIELDS }
/// }
/// ```
#[async_trait]
pub trait GameType: Send + Sync + 'static {
    /// Stable name persisted in the settings document's type map.
    fn type_name(&self) -> &'static str;

    /// Identifier this type registers under when no settings exist yet.
    fn default_identifier(&self) -> Option<&'static str> {
        None
    }

    /// Default startup command template.
    fn startup_command(&self) -> &'static str;

    fn stop_command(&self) -> StopCommand {
        StopCommand::Interrupt
    }

    /// Default readiness indicator. `Some("")` means the type calls
    /// `GameServer::mark_running` itself.
    fn start_indicator(&self) -> Option<&'static str> {
        None
    }

    /// Type-specific settings fields, merged over the base fields.
    fn fields(&self) -> &'static [FieldDescriptor] {
        &[]
    }

    /// Shared bins this type keeps under `storage/<identifier>/`.
    fn bins(&self) -> &'static [&'static str] {
        &[]
    }

    /// Runs every time a job object is constructed, including reloads.
    fn init(&self, _server: &GameServer) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs once, when a job is first created.
    async fn setup(&self, _server: &GameServer) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Fallback type for identifiers with no registered implementation.
///
/// Its startup command is empty, so jobs of this type need an explicit
/// `startup_command` before they can start.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericServer;

pub const GENERIC_TYPE_NAME: &str = "GameServer";

#[async_trait]
impl GameType for GenericServer {
    fn type_name(&self) -> &'static str {
        GENERIC_TYPE_NAME
    }

    fn startup_command(&self) -> &'static str {
        ""
    }
}
