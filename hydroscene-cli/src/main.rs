//! hydroscene CLI - Command-line interface
//!
//! Starts the control-room core with an operator console and manages its
//! configuration file.

mod commands;
mod console;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;

#[derive(Parser)]
#[command(name = "hydroscene")]
#[command(version = hydroscene::VERSION)]
#[command(about = "Scene orchestration for hydropower control rooms", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.hydroscene/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the control room with an interactive operator console
    Run,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// List the built-in operating scenes
    Scenes,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => commands::run::run(cli.config.as_deref()).await,
        Commands::Config { command } => commands::config::run(command, cli.config.as_deref()),
        Commands::Scenes => {
            commands::scenes::run();
            Ok(())
        }
    };

    if let Err(e) = result {
        e.exit();
    }
}
