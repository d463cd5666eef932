// Configuration management module
// TOML settings with compiled-in defaults for every field

pub mod settings;


pub use settings::{Config, ConfigError, IndexConfig, OllamaConfig, SourceConfig};

/// Print the effective configuration as TOML
#[inline]
pub fn show_config(config: &Config) -> anyhow::Result<()> {
    let config_path = config.config_file_path();
    if config_path.exists() {
        println!("# Loaded from {}", config_path.display());
    } else {
        println!("# No config file at {}, using defaults", config_path.display());
    }
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
