//! CLI entry point, the composition root.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lgs_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .compact()
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::from_cli(&cli);
    let ctx = bootstrap(&config)?;

    match cli.command {
        Commands::Serve => handlers::serve::execute(&ctx).await,
        Commands::Create {
            game_type,
            id,
            settings,
        } => handlers::create::execute(&ctx, &game_type, &id, &settings).await,
        Commands::List => handlers::list::execute(&ctx),
        Commands::Types => handlers::types::execute(&ctx),
        Commands::Setup { password } => handlers::setup::execute(&ctx, &password),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}
