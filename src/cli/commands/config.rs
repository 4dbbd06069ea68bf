//! Config Command
//!
//! Manage modelbridge configuration.
//!
//! Usage:
//!   modelbridge config show [-g] [-f json]
//!   modelbridge config path
//!   modelbridge config init [-g] [--force]

use crate::config::ConfigLoader;
use crate::types::Result;

/// Show configuration
pub fn show(global: bool, format: &str) -> Result<()> {
    let as_json = format == "json";

    if global {
        if let Some(global_path) = ConfigLoader::global_config_path() {
            if global_path.exists() {
                // Raw file contents would include the vault key
                let config = ConfigLoader::load_from_file(&global_path)?;
                println!("# Global Config: {}\n", global_path.display());
                if as_json {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                } else {
                    println!(
                        "{}",
                        toml::to_string_pretty(&config)
                            .map_err(|e| crate::types::ModelError::Config(e.to_string()))?
                    );
                }
            } else {
                println!("No global config found.");
                println!("Run 'modelbridge config init --global' to create one.");
            }
        } else {
            println!("Cannot determine global config directory.");
        }
    } else {
        ConfigLoader::show_config(as_json)?;
    }
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Initialize global configuration
pub fn init_global(force: bool) -> Result<()> {
    let path = ConfigLoader::init_global(force)?;
    println!("✓ Initialized global configuration");
    println!("  Config:    {}", path.display());
    Ok(())
}

/// Initialize project configuration
pub fn init_project(force: bool) -> Result<()> {
    let path = ConfigLoader::init_project(force)?;
    println!("✓ Initialized project configuration");
    println!("  Config:    {}", path.display());
    println!("  Keep this file out of version control: it holds the vault key.");
    Ok(())
}
