use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use client_core::{
    dispatch::DEFAULT_DISPATCH_DELAY,
    session::{DEFAULT_ADMIN_PASSWORD_SHA256, DEFAULT_ADMIN_USERNAME},
    AdminCredentials, DEFAULT_GATEWAY_URL, DEFAULT_REQUEST_TIMEOUT,
};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "admin_console.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub gateway_url: String,
    pub request_timeout: Duration,
    pub dispatch_delay: Duration,
    pub state_dir: PathBuf,
    pub admin_username: String,
    pub admin_password_sha256: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            dispatch_delay: DEFAULT_DISPATCH_DELAY,
            state_dir: default_state_dir(),
            admin_username: DEFAULT_ADMIN_USERNAME.into(),
            admin_password_sha256: DEFAULT_ADMIN_PASSWORD_SHA256.into(),
        }
    }
}

impl Settings {
    pub fn credentials(&self) -> AdminCredentials {
        AdminCredentials::new(&self.admin_username, &self.admin_password_sha256)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    gateway_url: Option<String>,
    request_timeout_secs: Option<u64>,
    dispatch_delay_secs: Option<u64>,
    state_dir: Option<PathBuf>,
    admin_username: Option<String>,
    admin_password_sha256: Option<String>,
}

fn default_state_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("foodfast-admin")
}

/// Defaults, then the config file, then environment variables.
///
/// An explicitly named config file must exist; the default
/// `admin_console.toml` in the working directory is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => {
            let file_cfg = toml::from_str::<FileSettings>(&raw)
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
    if let Some(v) = file_cfg.gateway_url {
        settings.gateway_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout = Duration::from_secs(v);
    }
    if let Some(v) = file_cfg.dispatch_delay_secs {
        settings.dispatch_delay = Duration::from_secs(v);
    }
    if let Some(v) = file_cfg.state_dir {
        settings.state_dir = v;
    }
    if let Some(v) = file_cfg.admin_username {
        settings.admin_username = v;
    }
    if let Some(v) = file_cfg.admin_password_sha256 {
        settings.admin_password_sha256 = v;
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let var = |names: [&str; 2]| names.into_iter().filter_map(&lookup).last();

    if let Some(v) = var(["FOODFAST_GATEWAY_URL", "APP__GATEWAY_URL"]) {
        settings.gateway_url = v;
    }
    if let Some(v) = var(["FOODFAST_REQUEST_TIMEOUT_SECS", "APP__REQUEST_TIMEOUT_SECS"]) {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout = Duration::from_secs(parsed);
        }
    }
    if let Some(v) = var(["FOODFAST_DISPATCH_DELAY_SECS", "APP__DISPATCH_DELAY_SECS"]) {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.dispatch_delay = Duration::from_secs(parsed);
        }
    }
    if let Some(v) = var(["FOODFAST_STATE_DIR", "APP__STATE_DIR"]) {
        settings.state_dir = PathBuf::from(v);
    }
    if let Some(v) = var(["FOODFAST_ADMIN_USERNAME", "APP__ADMIN_USERNAME"]) {
        settings.admin_username = v;
    }
    if let Some(v) = var(["FOODFAST_ADMIN_PASSWORD_SHA256", "APP__ADMIN_PASSWORD_SHA256"]) {
        settings.admin_password_sha256 = v;
    }
}
