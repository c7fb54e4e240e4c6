//! Configuration view and validation commands: `quadrant config`.

use std::path::Path;

use anyhow::{Context, Result};

use quadrant::config::QuadrantConfig;
use quadrant::ui::icons::{CHECK, INFO};

use super::super::ConfigCommands;

pub fn cmd_config(
    config: &QuadrantConfig,
    config_path: &Path,
    command: Option<ConfigCommands>,
) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Quadrant Configuration");
            println!("======================");
            println!();
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No {} found; using defaults", config_path.display());
            }
            println!();

            let toml = toml::to_string_pretty(config).context("Failed to render configuration")?;
            println!("{}", toml.trim_end());
            println!();

            println!("Effective paths (with env overrides):");
            println!("  database = \"{}\"", config.db_path().display());
            println!("  session  = \"{}\"", config.session_path().display());
            println!("  logs     = \"{}\"", config.log_dir().display());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            let warnings = config.validate();
            if warnings.is_empty() {
                println!("{}Configuration is valid", CHECK);
            } else {
                println!("Configuration warnings:");
                for warning in &warnings {
                    println!("  {}{}", INFO, warning);
                }
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("{} already exists", config_path.display());
                return Ok(());
            }
            QuadrantConfig::default().save(config_path)?;
            println!("{}Created {}", CHECK, config_path.display());
        }
    }
    Ok(())
}
