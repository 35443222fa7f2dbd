//! `lgs types`

use anyhow::Result;

use crate::bootstrap::CliContext;

pub fn execute(ctx: &CliContext) -> Result<()> {
    let types = ctx.manager().registered_types();
    if types.is_empty() {
        println!("No job type identifiers registered; every server uses the generic type.");
        return Ok(());
    }
    for (identifier, type_name) in types {
        println!("{identifier:<24} {type_name}");
    }
    Ok(())
}
