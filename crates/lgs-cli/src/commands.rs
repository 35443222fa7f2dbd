//! Available subcommands.

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load every server, auto-start flagged ones and run until Ctrl-C
    Serve,

    /// Create a server and save it to the servers document
    Create {
        /// Game type, e.g. "minecraft" or "minecraft/paper"
        game_type: String,
        /// Server id, unique within its game type
        id: String,
        /// Initial settings as key=value; values are parsed as JSON when possible
        #[arg(long = "set", value_name = "KEY=VALUE")]
        settings: Vec<String>,
    },

    /// List persisted servers
    List,

    /// Show the identifier to job type map
    Types,

    /// Complete first-time setup by storing the admin password
    Setup {
        #[arg(long, env = "LGS_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[cfg(test)]
mod tests {
    use crate::Cli;
    use clap::Parser;

    use super::*;

    #[test]
    fn create_collects_settings() {
        let cli = Cli::parse_from([
            "lgs",
            "create",
            "minecraft/paper",
            "lobby",
            "--set",
            "auto_start=true",
            "--set",
            "startup_command=java -jar paper.jar",
        ]);
        match cli.command {
            Commands::Create {
                game_type,
                id,
                settings,
            } => {
                assert_eq!(game_type, "minecraft/paper");
                assert_eq!(id, "lobby");
                assert_eq!(settings.len(), 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
