//! `lgs serve`: run every auto-start server until Ctrl-C.

use anyhow::Result;
use lgs_core::JobEvent;
use tracing::{info, warn};

use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn execute(ctx: &CliContext) -> Result<()> {
    let manager = ctx.manager();

    for server in manager.servers() {
        let key = server.key().clone();
        server.subscribe(
            move |event, _| match event {
                JobEvent::Status { status } => info!(job = %key, status = status.as_str(), "Status changed"),
                JobEvent::ConsoleLine(line) if line.is_error => warn!(job = %key, "{}", line.text),
                JobEvent::ConsoleLine(line) => info!(job = %key, "{}", line.text),
                JobEvent::Custom(_) => {}
            },
            None,
        );
    }

    let started = manager.auto_start_all();
    println!(
        "Managing {} server(s), {started} started. Press Ctrl-C to stop.",
        manager.servers().len()
    );

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down");

    manager.shutdown_all().await;
    manager.save_servers().map_err(CliError::from)?;
    manager.save_settings().map_err(CliError::from)?;
    Ok(())
}
