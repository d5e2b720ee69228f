//! Settings loading
//!
//! Layers, lowest first: built-in defaults, an optional TOML file
//! (`config.toml` or whatever `MEME_CONFIG` names), then environment
//! variables such as `POLL_INTERVAL_MS` or `PORT`.

use anyhow::Context;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use tracing::info;

use meme_core::AppConfig;

pub const CONFIG_PATH_VAR: &str = "MEME_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "config";

pub fn load_settings() -> anyhow::Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    info!("Loading settings (file: {}, optional)", path);

    let builder = Config::builder()
        .add_source(File::with_name(&path).required(false))
        .add_source(Environment::default().try_parsing(true));

    finish(builder)
}

/// Deserialize and validate a prepared builder
pub fn finish(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<AppConfig> {
    let settings: AppConfig = builder
        .build()
        .context("failed to read settings")?
        .try_deserialize()
        .context("failed to parse settings")?;

    settings.validate()?;
    Ok(settings)
}
