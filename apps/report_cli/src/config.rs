use std::{fs, io, path::Path};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::FormVariant;

pub const DEFAULT_CONFIG_PATH: &str = "report-client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub variant: FormVariant,
    pub clear_report_on_error: bool,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".into(),
            variant: FormVariant::Basic,
            clear_report_on_error: false,
            log_filter: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_url: Option<String>,
    variant: Option<FormVariant>,
    clear_report_on_error: Option<bool>,
    log_filter: Option<String>,
}

/// Defaults, then the config file, then environment overrides. A missing
/// default file is fine; a missing file passed explicitly is not.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?,
        Err(err) if config_path.is_none() && err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

pub(crate) fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileConfig = toml::from_str(raw)?;
    if let Some(v) = file_cfg.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file_cfg.variant {
        settings.variant = v;
    }
    if let Some(v) = file_cfg.clear_report_on_error {
        settings.clear_report_on_error = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    Ok(())
}

pub(crate) fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("REPORT_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_url = v;
    }

    for key in ["REPORT_VARIANT", "APP__VARIANT"] {
        if let Some(v) = lookup(key) {
            settings.variant = v
                .parse::<FormVariant>()
                .with_context(|| format!("invalid value for {key}"))?;
        }
    }

    if let Some(v) = lookup("APP__CLEAR_REPORT_ON_ERROR") {
        settings.clear_report_on_error = parse_flag(&v)
            .with_context(|| format!("invalid value for APP__CLEAR_REPORT_ON_ERROR: '{v}'"))?;
    }

    if let Some(v) = lookup("RUST_LOG") {
        settings.log_filter = v;
    }

    Ok(())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
