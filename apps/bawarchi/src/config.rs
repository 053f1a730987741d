use std::{collections::HashMap, fs};

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use tracing::warn;
use url::Url;

pub const CONFIG_FILE: &str = "bawarchi.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub recipe_api_url: Option<String>,
    pub community_api_url: Option<String>,
    pub database_url: String,
    /// Text-to-speech command line; narration goes to the log when unset.
    pub narration_command: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recipe_api_url: None,
            community_api_url: None,
            database_url: "sqlite://./data/bawarchi.db".into(),
            narration_command: None,
        }
    }
}

impl Settings {
    pub fn recipe_endpoint(&self) -> anyhow::Result<Url> {
        parse_endpoint("recipe_api_url", self.recipe_api_url.as_deref())
    }

    pub fn community_endpoint(&self) -> anyhow::Result<Url> {
        parse_endpoint("community_api_url", self.community_api_url.as_deref())
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string(CONFIG_FILE).ok();
    settings_from(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the config file, then the environment. For every setting the
/// `APP__` variable wins over the plain one.
fn settings_from(file: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match toml::from_str::<HashMap<String, String>>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("recipe_api_url") {
                    settings.recipe_api_url = Some(v.clone());
                }
                if let Some(v) = file_cfg.get("community_api_url") {
                    settings.community_api_url = Some(v.clone());
                }
                if let Some(v) = file_cfg.get("database_url") {
                    settings.database_url = v.clone();
                }
                if let Some(v) = file_cfg.get("narration_command") {
                    settings.narration_command = Some(v.clone());
                }
            }
            Err(error) => warn!(%error, "ignoring malformed {CONFIG_FILE}"),
        }
    }

    if let Some(v) = env_override(&env, &["RECIPE_API_URL", "APP__RECIPE_API_URL"]) {
        settings.recipe_api_url = Some(v);
    }
    if let Some(v) = env_override(&env, &["COMMUNITY_API_URL", "APP__COMMUNITY_API_URL"]) {
        settings.community_api_url = Some(v);
    }
    if let Some(v) = env_override(&env, &["DATABASE_URL", "APP__DATABASE_URL"]) {
        settings.database_url = v;
    }
    if let Some(v) = env_override(&env, &["APP__NARRATION_COMMAND"]) {
        settings.narration_command = Some(v);
    }

    settings
}

fn env_override(env: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|key| env(*key)).last()
}

fn parse_endpoint(name: &str, raw: Option<&str>) -> anyhow::Result<Url> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| anyhow!("{name} is not configured; set it in {CONFIG_FILE} or the environment"))?;
    let url = Url::parse(raw).with_context(|| format!("{name} '{raw}' is not a valid URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{name} must start with http:// or https://");
    }
    Ok(url)
}

/// Turns the configured database setting into a SQLite URL and makes sure
/// its directory exists. A bare path is taken as a file.
pub fn prepare_database_url(setting: &str) -> anyhow::Result<String> {
    let database_url = sqlite_url_from_setting(setting);
    storage::create_database_dir(&database_url)?;
    Ok(database_url)
}

fn sqlite_url_from_setting(setting: &str) -> String {
    match setting.trim() {
        "" => Settings::default().database_url,
        url if url.starts_with("sqlite::memory:") || url.contains("://") => url.to_string(),
        file => {
            let file = file.strip_prefix("sqlite:").unwrap_or(file);
            format!("sqlite://{}", file.replace('\\', "/"))
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
