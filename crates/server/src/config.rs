use std::{collections::HashMap, fs, path::PathBuf};

use server_api::config::DEFAULT_CONFIG_PATH;

pub const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug)]
pub struct Settings {
    pub server_bind: String,
    pub config_path: PathBuf,
    pub openai_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            openai_api_key: None,
        }
    }
}

pub fn load_settings() -> Settings {
    let raw = fs::read_to_string(SETTINGS_FILE).ok();
    settings_from(raw.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then `server.toml`, then environment variables.
pub(crate) fn settings_from(
    settings_file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = settings_file {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
            if let Some(v) = file_cfg.get("bind_addr") {
                settings.server_bind = v.clone();
            }
            if let Some(v) = file_cfg.get("config_path") {
                settings.config_path = PathBuf::from(v);
            }
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("APP__CONFIG_PATH") {
        settings.config_path = PathBuf::from(v);
    }

    settings.openai_api_key = env("OPENAI_API_KEY").filter(|v| !v.trim().is_empty());

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
