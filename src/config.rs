//! Dev only - 示例程序的 config.toml 配置

use std::fs;
use anyhow::Context;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub token: Option<String>,
    pub entity_id: String,
    pub file_path: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Config> {
        let config_str = fs::read_to_string("config.toml")
            .context("Something went wrong reading config.toml")?;
        toml::from_str(&config_str).context("Can't parse config.toml")
    }
}
