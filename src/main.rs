mod apps;
mod commands;
mod config;
mod db;
mod error;
mod executor;
mod gate;
mod pipeline;
mod planner;
mod ranking;
mod router;
mod safety;
mod shortcuts;
mod types;
mod ui;

use clap::{CommandFactory, Parser, Subcommand};
use commands::{
    cmd_add, cmd_config, cmd_doctor, cmd_history, cmd_list, cmd_logs, cmd_plan, cmd_run,
    ConfigAction,
};
use config::load_config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "o", version)]
#[command(about = "Turns plain-language input into risk-gated shell commands")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Skip confirmations; also allows high-risk commands
    #[arg(short, long)]
    yes: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    /// What to do, e.g. `gh`, `open slack`, `search for borrow checker`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    input: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a plan payload (JSON) from FILE, or stdin when omitted
    Plan {
        file: Option<PathBuf>,

        /// Skip confirmations; also allows high-risk commands
        #[arg(short, long)]
        yes: bool,
    },

    /// Add or replace a shortcut
    Add {
        phrase: String,

        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },

    /// List shortcuts
    List {
        /// Order by how often and how recently each shortcut was used
        #[arg(long)]
        ranked: bool,

        /// List configured applications instead
        #[arg(long, conflicts_with = "ranked")]
        apps: bool,
    },

    /// List execution logs
    Logs {
        /// Print the newest log
        #[arg(long)]
        last: bool,
    },

    /// Show recent invocations
    History {
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Read or change settings
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// Check configuration and storage
    Doctor,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show every setting
    List,
    /// Show one setting
    Get { key: String },
    /// Change one setting
    Set { key: String, value: String },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut config = load_config();

    let result = match cli.command {
        Some(Commands::Plan { file, yes }) => cmd_plan(file.as_deref(), &config, cli.yes || yes),
        Some(Commands::Add { phrase, command }) => cmd_add(&phrase, &command),
        Some(Commands::List { ranked, apps }) => cmd_list(&config, ranked, apps),
        Some(Commands::Logs { last }) => cmd_logs(last),
        Some(Commands::History { limit }) => cmd_history(limit),
        Some(Commands::Config { action }) => {
            let action = match action {
                ConfigCommand::List => ConfigAction::List,
                ConfigCommand::Get { key } => ConfigAction::Get(key),
                ConfigCommand::Set { key, value } => ConfigAction::Set(key, value),
            };
            cmd_config(&mut config, action)
        }
        Some(Commands::Doctor) => cmd_doctor(&config),
        None => {
            if cli.input.is_empty() {
                Cli::command().print_help().ok();
                return;
            }
            cmd_run(&cli.input.join(" "), &config, cli.yes)
        }
    };

    if let Err(e) = result {
        log::debug!("{:?}", e);
        eprintln!("o: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn input_keeps_hyphenated_words() {
        let cli = Cli::try_parse_from(["o", "ls", "-la"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.input, vec!["ls", "-la"]);

        let cli = Cli::try_parse_from(["o", "-y", "rm", "-rf", "build"]).unwrap();
        assert!(cli.yes);
        assert_eq!(cli.input, vec!["rm", "-rf", "build"]);
    }

    #[test]
    fn subcommands_still_parse() {
        let cli = Cli::try_parse_from(["o", "list", "--ranked"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::List {
                ranked: true,
                apps: false
            })
        ));
    }
}
