//! Root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Run and manage game servers from one data directory.
#[derive(Parser)]
#[command(name = "lgs")]
#[command(about = "Supervise game server processes")]
#[command(version)]
pub struct Cli {
    /// Data directory holding settings.json, servers/ and storage/
    #[arg(long, short = 'd', global = true, env = "LGS_DIRECTORY", default_value = ".")]
    pub directory: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, global = true, env = "LGS_DEBUG")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_args() {
        let cli = Cli::parse_from(["lgs", "--debug", "-d", "/srv/games", "list"]);
        assert!(cli.debug);
        assert_eq!(cli.directory, PathBuf::from("/srv/games"));
        assert!(matches!(cli.command, Commands::List));
    }
}
