//! `lgs setup`

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::error::CliError;

pub fn execute(ctx: &CliContext, password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(CliError::Arguments("password must not be empty".into()).into());
    }
    let manager = ctx.manager();
    manager.complete_setup(password).map_err(CliError::from)?;
    if !manager.save_settings().map_err(CliError::from)? {
        return Err(CliError::Config(
            "settings document is unreadable; fix or remove it and retry".into(),
        )
        .into());
    }
    println!("Setup complete.");
    Ok(())
}
