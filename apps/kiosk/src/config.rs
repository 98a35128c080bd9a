use std::{fs, io, path::Path};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "kiosk.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KioskSettings {
    pub server_url: String,
    pub ws_path: String,
    pub log_filter: String,
    pub reconnect_delay_ms: u64,
    /// Used until the backend sends its first `config_update`.
    pub initial_required_classes: Vec<String>,
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5001".into(),
            ws_path: "/ws".into(),
            log_filter: "info".into(),
            reconnect_delay_ms: 2000,
            initial_required_classes: vec!["Head".into(), "Hands".into()],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    server_url: Option<String>,
    ws_path: Option<String>,
    log_filter: Option<String>,
    reconnect_delay_ms: Option<u64>,
    required_classes: Option<Vec<String>>,
}

pub fn load_settings(path: &Path) -> anyhow::Result<KioskSettings> {
    let mut settings = KioskSettings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut KioskSettings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.ws_path {
        settings.ws_path = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    if let Some(v) = file_cfg.reconnect_delay_ms {
        settings.reconnect_delay_ms = v;
    }
    if let Some(v) = file_cfg.required_classes {
        settings.initial_required_classes = v;
    }
    Ok(())
}

fn apply_env(settings: &mut KioskSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("KIOSK_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__WS_PATH") {
        settings.ws_path = v;
    }
    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
    if let Some(v) = var("APP__RECONNECT_DELAY_MS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.reconnect_delay_ms = parsed;
        }
    }
    if let Some(v) = var("APP__REQUIRED_CLASSES") {
        settings.initial_required_classes = split_classes(&v);
    }
}

pub fn split_classes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|class| !class.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
