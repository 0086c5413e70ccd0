use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub data_dir: String,
    pub jwt_secret: String,
    pub token_ttl_seconds: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:3000".into(),
            data_dir: "./data".into(),
            jwt_secret: String::new(),
            token_ttl_seconds: 3600,
        }
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string("server.toml").ok();
    settings_from(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then `server.toml` keys, then environment variables.
pub(crate) fn settings_from(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
            if let Some(v) = file_cfg.get("bind_addr") {
                settings.server_bind = v.clone();
            }
            if let Some(v) = file_cfg.get("data_dir") {
                settings.data_dir = v.clone();
            }
            if let Some(v) = file_cfg.get("jwt_secret") {
                settings.jwt_secret = v.clone();
            }
        }
    }

    if let Some(port) = env("PORT").and_then(|v| v.parse::<u16>().ok()) {
        settings.server_bind = format!("0.0.0.0:{port}");
    }
    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("DATA_DIR") {
        settings.data_dir = v;
    }
    if let Some(v) = env("APP__DATA_DIR") {
        settings.data_dir = v;
    }

    if let Some(v) = env("JWT_SECRET") {
        settings.jwt_secret = v;
    }
    if let Some(v) = env("APP__JWT_SECRET") {
        settings.jwt_secret = v;
    }

    if let Some(ttl) = env("APP__TOKEN_TTL_SECONDS").and_then(|v| v.parse::<i64>().ok()) {
        settings.token_ttl_seconds = ttl;
    }

    settings
}

pub fn prepare_data_dir(raw_data_dir: &str) -> anyhow::Result<PathBuf> {
    let raw_data_dir = raw_data_dir.trim();
    let data_dir = if raw_data_dir.is_empty() {
        PathBuf::from(Settings::default().data_dir)
    } else {
        PathBuf::from(raw_data_dir)
    };

    fs::create_dir_all(&data_dir).with_context(|| {
        format!("failed to create data directory '{}'", data_dir.display())
    })?;

    Ok(data_dir)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
