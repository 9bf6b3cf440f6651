//! Configuration command handlers for the deploytrack CLI

use anyhow::Context;
use deploy_tracker::TrackerConfig;

use crate::ConfigCommands;

pub fn handle_config_command(cmd: ConfigCommands, config: &TrackerConfig) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let store_dir = config.store_dir()?;
            println!("# Store directory: {}", store_dir.display());
            let rendered =
                toml::to_string_pretty(config).context("Failed to serialize configuration")?;
            print!("{rendered}");
        }
        ConfigCommands::Init { path, force } => {
            let path = match path {
                Some(path) => path,
                None => TrackerConfig::default_config_path()?,
            };
            if path.exists() && !force {
                eprintln!(
                    "✗ {} already exists (use --force to overwrite)",
                    path.display()
                );
                anyhow::bail!("refusing to overwrite {}", path.display());
            }

            TrackerConfig::default().save_to_file(&path)?;
            println!("✓ Wrote default configuration to {}", path.display());
        }
    }
    Ok(())
}
