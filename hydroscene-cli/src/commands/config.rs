//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init`.

use std::path::Path;

use clap::Subcommand;
use hydroscene::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration (file values over defaults)
    Show,

    /// Write a commented configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);

    match command {
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => run_show(&path),
        ConfigCommands::Init { force } => run_init(&path, force),
    }
}

fn run_show(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;
    let runtime = config.runtime_config();

    println!("Config file: {}", path.display());
    if !path.exists() {
        println!("  (not found, showing defaults)");
    }
    println!();
    println!("[scenes]");
    println!("  initializer_timeout   {:?}", runtime.scenes.initializer_timeout);
    println!("  audit_capacity        {}", runtime.scenes.audit_capacity);
    println!("[preferences]");
    println!("  auto_switch_scenes    {}", runtime.preferences.auto_switch_scenes);
    println!("  ai_suggestions        {}", runtime.preferences.ai_suggestions);
    println!("  threshold_alerts      {}", runtime.preferences.threshold_alerts);
    println!("[threshold]");
    println!("  cooldown              {:?}", runtime.threshold.cooldown);
    println!("  batch_deadline        {:?}", runtime.threshold.batch_deadline);
    println!("  alert_capacity        {}", runtime.threshold.alert_capacity);
    println!("  feed_capacity         {}", runtime.threshold.feed_capacity);
    if runtime.threshold.rules.is_empty() {
        println!("  rules                 (none)");
    }
    for rule in &runtime.threshold.rules {
        println!("  rule                  {}", rule);
    }
    println!("[suggestion]");
    println!("  auto_apply_confidence {}", runtime.arbiter.auto_apply_confidence);
    println!("[display]");
    println!("  heartbeat_timeout     {:?}", runtime.display.heartbeat_timeout);
    println!("  sweep_interval        {:?}", runtime.display.sweep_interval);
    println!("  delivery_timeout      {:?}", runtime.sync.delivery_timeout);
    println!("  delivery_retries      {}", runtime.sync.delivery_retries);
    println!("[playlist]");
    println!("  pause_on_emergency    {}", runtime.pause_on_emergency);
    println!("[state]");
    println!("  path                  {}", config.state.path.display());
    println!("[logging]");
    println!(
        "  file                  {}",
        config.logging.directory.join(&config.logging.file).display()
    );
    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
