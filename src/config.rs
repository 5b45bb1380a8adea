use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

use crate::error::Error;

const CONFIG_ENV: &str = "DOMAIN_WATCH_CONFIG";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub config: ConfigOptions,
    #[serde(default)]
    pub discord: DiscordOptions,
    #[serde(default)]
    pub telegram: TelegramOptions,
}

#[derive(Debug, Deserialize)]
pub struct ConfigOptions {
    pub domains: Vec<String>,
    #[serde(default = "default_every_secs")]
    pub every_secs: u64,
    #[serde(default = "default_sleep_secs")]
    pub sleep_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscordOptions {
    pub webhook_url: Option<String>,
    pub discord_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TelegramOptions {
    pub token: Option<String>,
    pub chat_id: Option<i64>,
}

fn default_every_secs() -> u64 {
    12 * 60 * 60
}

fn default_sleep_secs() -> u64 {
    3
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_thresholds() -> Vec<i64> {
    vec![1, 7]
}

impl Config {
    /// Loads the configuration from `DOMAIN_WATCH_CONFIG`, or from
    /// `<config dir>/domain-watch/config.toml` when the variable is unset.
    ///
    /// # Errors
    ///
    /// Returns an error if no config directory can be determined, the file
    /// cannot be read or parsed, or a value fails validation.
    pub fn load() -> Result<Config, Error> {
        Config::load_from(default_path()?)
    }

    /// Loads and validates the configuration at `path`, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a value
    /// fails validation.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Env takes over whatever the file left unset
        if config.discord.webhook_url.is_none() {
            config.discord.webhook_url = dotenvy::var("WEBHOOK_URL").ok();
        }
        if config.discord.discord_id.is_none() {
            config.discord.discord_id = parse_env("DISCORD_ID")?;
        }
        if config.telegram.token.is_none() {
            config.telegram.token = dotenvy::var("TELEGRAM_TOKEN").ok();
        }
        if config.telegram.chat_id.is_none() {
            config.telegram.chat_id = parse_env("TELEGRAM_CHAT")?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.config.domains.is_empty() {
            return Err(Error::Config("at least one domain is required".into()));
        }
        if self.config.every_secs == 0 {
            return Err(Error::Config("every_secs must be greater than 0".into()));
        }
        if let Some(webhook_url) = &self.discord.webhook_url {
            Url::parse(webhook_url)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn every(&self) -> Duration {
        Duration::from_secs(self.config.every_secs)
    }

    #[must_use]
    pub fn sleep(&self) -> Duration {
        Duration::from_secs(self.config.sleep_secs)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

fn default_path() -> Result<PathBuf, Error> {
    if let Ok(path) = dotenvy::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("domain-watch").join("config.toml"))
        .ok_or_else(|| Error::Config("could not determine config directory".into()))
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, Error> {
    match dotenvy::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} is not a valid number"))),
        Err(_) => Ok(None),
    }
}
