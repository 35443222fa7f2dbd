//! `lgs create`

use anyhow::Result;
use serde_json::{Map, Value};

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Parse `key=value` pairs. Values that parse as JSON keep their type,
/// anything else becomes a string.
pub fn parse_settings(pairs: &[String]) -> Result<Map<String, Value>, CliError> {
    let mut fields = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| CliError::Arguments(format!("expected KEY=VALUE, got {pair:?}")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::Arguments(format!("missing key in {pair:?}")));
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw));
        fields.insert(key.to_string(), value);
    }
    Ok(fields)
}

pub async fn execute(
    ctx: &CliContext,
    game_type: &str,
    id: &str,
    settings: &[String],
) -> Result<()> {
    let fields = parse_settings(settings)?;
    let manager = ctx.manager();
    let server = manager
        .create_job(game_type, id, &fields)
        .await
        .map_err(CliError::from)?;
    manager.save_servers().map_err(CliError::from)?;

    println!(
        "Created {} ({}) in {}",
        server.key(),
        server.kind().type_name(),
        server.directory().display()
    );
    Ok(())
}
