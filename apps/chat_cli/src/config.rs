use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use client_core::{settings, ControllerSettings};
use serde::Deserialize;
use shared::{domain::IdentifierField, protocol::ResponseShapes};
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "chat_client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub model: String,
    pub provider: String,
    pub identifier_field: IdentifierField,
    pub reset_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub show_loading: bool,
    pub response_shapes: ResponseShapes,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".into(),
            model: settings::DEFAULT_MODEL.into(),
            provider: settings::DEFAULT_PROVIDER.into(),
            identifier_field: IdentifierField::UserId,
            reset_delay_ms: settings::DEFAULT_RESET_DELAY.as_millis() as u64,
            request_timeout_secs: 30,
            show_loading: true,
            response_shapes: ResponseShapes::Legacy,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            model: self.model.clone(),
            provider: self.provider.clone(),
            identifier_field: self.identifier_field,
            reset_delay: Duration::from_millis(self.reset_delay_ms),
            show_loading_indicator: self.show_loading,
        }
    }
}

/// Keys accepted in `chat_client.toml`. Anything left out keeps its default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    base_url: Option<String>,
    model: Option<String>,
    provider: Option<String>,
    identifier_field: Option<IdentifierField>,
    reset_delay_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    show_loading: Option<bool>,
    response_shapes: Option<ResponseShapes>,
}

/// Defaults, then the config file, then environment overrides.
///
/// An explicitly passed `path` must exist; the default file is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
            apply_file(&mut settings, file_cfg);
        }
        Err(err) if required || err.kind() != std::io::ErrorKind::NotFound => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()));
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.base_url {
        settings.base_url = v;
    }
    if let Some(v) = file_cfg.model {
        settings.model = v;
    }
    if let Some(v) = file_cfg.provider {
        settings.provider = v;
    }
    if let Some(v) = file_cfg.identifier_field {
        settings.identifier_field = v;
    }
    if let Some(v) = file_cfg.reset_delay_ms {
        settings.reset_delay_ms = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.show_loading {
        settings.show_loading = v;
    }
    if let Some(v) = file_cfg.response_shapes {
        settings.response_shapes = v;
    }
}

pub(crate) fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("CHAT_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = lookup("APP__BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = lookup("APP__MODEL") {
        settings.model = v;
    }
    if let Some(v) = lookup("APP__PROVIDER") {
        settings.provider = v;
    }
    if let Some(v) = lookup("APP__IDENTIFIER_FIELD") {
        match IdentifierField::parse(&v) {
            Some(field) => settings.identifier_field = field,
            None => warn!(value = %v, "ignoring unknown APP__IDENTIFIER_FIELD"),
        }
    }
    if let Some(v) = lookup("APP__RESET_DELAY_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.reset_delay_ms = parsed,
            Err(_) => warn!(value = %v, "ignoring non-numeric APP__RESET_DELAY_MS"),
        }
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = parsed,
            Err(_) => warn!(value = %v, "ignoring non-numeric APP__REQUEST_TIMEOUT_SECS"),
        }
    }
    if let Some(v) = lookup("APP__SHOW_LOADING") {
        match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => settings.show_loading = true,
            "0" | "false" | "no" | "off" => settings.show_loading = false,
            _ => warn!(value = %v, "ignoring invalid APP__SHOW_LOADING"),
        }
    }
    if let Some(v) = lookup("APP__RESPONSE_SHAPES") {
        match ResponseShapes::parse(&v) {
            Some(shapes) => settings.response_shapes = shapes,
            None => warn!(value = %v, "ignoring unknown APP__RESPONSE_SHAPES"),
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
