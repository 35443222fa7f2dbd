//! `lgs list`

use anyhow::Result;

use crate::bootstrap::CliContext;

pub fn execute(ctx: &CliContext) -> Result<()> {
    let servers = ctx.manager().servers();
    if servers.is_empty() {
        println!("No servers configured.");
        println!("Use 'lgs create <type> <id>' to add one.");
        return Ok(());
    }

    println!("{:<24} {:<16} {:<10} {:<8} Command", "Type", "Id", "Job type", "Auto");
    for server in servers {
        let settings = server.settings();
        println!(
            "{:<24} {:<16} {:<10} {:<8} {}",
            server.key().game_type,
            server.key().id,
            server.kind().type_name(),
            if settings.auto_start { "yes" } else { "no" },
            settings.startup_command
        );
    }
    Ok(())
}
