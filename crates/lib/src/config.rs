//! Configuration types and loading.
//!
//! Two layers. [`ServerConfig`] (bind address, port, public URL) is loaded once at startup
//! from an optional JSON file with environment overrides. [`Config`] (credentials and API
//! base URLs) is rebuilt from an [`EnvSource`] at the start of every webhook request and
//! passed explicitly to the components that need it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_API_BASE: &str = "TELEGRAM_API_BASE";
pub const TELEGRAM_SECRET_TOKEN: &str = "TELEGRAM_SECRET_TOKEN";
pub const WELCOME_MESSAGE: &str = "WELCOME_MESSAGE";
pub const RESPOND_IO_API_TOKEN: &str = "RESPOND_IO_API_TOKEN";
pub const RESPOND_IO_CHANNEL_ID: &str = "RESPOND_IO_CHANNEL_ID";
pub const RESPOND_IO_BASE_URL: &str = "RESPOND_IO_BASE_URL";
pub const RESPOND_IO_WEBHOOK_SECRET: &str = "RESPOND_IO_WEBHOOK_SECRET";
pub const RELAY_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";
pub const RELAY_BIND: &str = "RELAY_BIND";
pub const RELAY_PORT: &str = "RELAY_PORT";
pub const RELAY_PUBLIC_URL: &str = "RELAY_PUBLIC_URL";

const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_RESPOND_IO_BASE_URL: &str = "https://api.respond.io";
const DEFAULT_WELCOME_MESSAGE: &str =
    "Добро пожаловать! Я бот поддержки. Напишите ваш вопрос, и я передам его нашим специалистам.";

/// Source of environment variables. The gateway reads through this instead of the
/// process environment directly so tests can supply their own values.
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Read a variable, trimming whitespace; empty values count as unset.
fn non_empty(env: &dyn EnvSource, key: &str) -> Option<String> {
    env.var(key).and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("{var} environment variable is invalid: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Per-request configuration. Built from an [`EnvSource`]; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub respond_io: RespondIoConfig,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub api_base: String,
    /// Webhook secret; when set, inbound updates must carry a matching signature header.
    pub secret_token: Option<String>,
    pub welcome_message: String,
}

#[derive(Debug, Clone)]
pub struct RespondIoConfig {
    pub api_token: Option<String>,
    /// Raw channel id; parsed to an integer by [`Config::respond_io_credentials`].
    pub channel_id: Option<String>,
    pub base_url: String,
    pub webhook_secret: Option<String>,
}

/// Telegram credentials that passed validation.
#[derive(Debug, Clone)]
pub struct TelegramCredentials {
    pub bot_token: String,
    pub api_base: String,
}

/// respond.io credentials that passed validation.
#[derive(Debug, Clone)]
pub struct RespondIoCredentials {
    pub api_token: String,
    pub channel_id: i64,
    pub base_url: String,
}

impl Config {
    pub fn from_env(env: &dyn EnvSource) -> Self {
        Self {
            telegram: TelegramConfig {
                bot_token: non_empty(env, TELEGRAM_BOT_TOKEN),
                api_base: non_empty(env, TELEGRAM_API_BASE)
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string()),
                secret_token: non_empty(env, TELEGRAM_SECRET_TOKEN),
                welcome_message: non_empty(env, WELCOME_MESSAGE)
                    .unwrap_or_else(|| DEFAULT_WELCOME_MESSAGE.to_string()),
            },
            respond_io: RespondIoConfig {
                api_token: non_empty(env, RESPOND_IO_API_TOKEN),
                channel_id: non_empty(env, RESPOND_IO_CHANNEL_ID),
                base_url: non_empty(env, RESPOND_IO_BASE_URL)
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_RESPOND_IO_BASE_URL.to_string()),
                webhook_secret: non_empty(env, RESPOND_IO_WEBHOOK_SECRET),
            },
        }
    }

    pub fn telegram_credentials(&self) -> Result<TelegramCredentials, ConfigError> {
        let bot_token = self
            .telegram
            .bot_token
            .clone()
            .ok_or(ConfigError::Missing(TELEGRAM_BOT_TOKEN))?;
        Ok(TelegramCredentials {
            bot_token,
            api_base: self.telegram.api_base.clone(),
        })
    }

    pub fn respond_io_credentials(&self) -> Result<RespondIoCredentials, ConfigError> {
        let api_token = self
            .respond_io
            .api_token
            .clone()
            .ok_or(ConfigError::Missing(RESPOND_IO_API_TOKEN))?;
        let raw = self
            .respond_io
            .channel_id
            .as_deref()
            .ok_or(ConfigError::Missing(RESPOND_IO_CHANNEL_ID))?;
        let channel_id = raw.parse::<i64>().map_err(|_| ConfigError::Invalid {
            var: RESPOND_IO_CHANNEL_ID,
            value: raw.to_string(),
        })?;
        Ok(RespondIoCredentials {
            api_token,
            channel_id,
            base_url: self.respond_io.base_url.clone(),
        })
    }
}

/// Gateway bind, port and public URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for HTTP (default 15151).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Externally reachable base URL (e.g. behind a reverse proxy). Used for the health page
    /// and for webhook registration.
    #[serde(default)]
    pub public_url: Option<String>,
}

fn default_port() -> u16 {
    15151
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            public_url: None,
        }
    }
}

impl ServerConfig {
    /// Public base URL without trailing slash; falls back to the bound address.
    pub fn public_base_url(&self) -> String {
        match self.public_url.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.bind.trim(), self.port),
        }
    }

    fn apply_env(&mut self, env: &dyn EnvSource) -> Result<()> {
        if let Some(bind) = non_empty(env, RELAY_BIND) {
            self.bind = bind;
        }
        if let Some(port) = non_empty(env, RELAY_PORT) {
            self.port = port
                .parse()
                .with_context(|| format!("parsing {} value {:?}", RELAY_PORT, port))?;
        }
        if let Some(url) = non_empty(env, RELAY_PUBLIC_URL) {
            self.public_url = Some(url);
        }
        Ok(())
    }
}

/// Resolve config path from env or default (`relay.json` in the working directory).
pub fn default_config_path(env: &dyn EnvSource) -> PathBuf {
    non_empty(env, RELAY_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("relay.json"))
}

/// Load server config from `path` (or the default path). Missing file => defaults.
/// Environment variables override values from the file.
pub fn load_server_config(path: Option<PathBuf>, env: &dyn EnvSource) -> Result<ServerConfig> {
    let path = path.unwrap_or_else(|| default_config_path(env));
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        ServerConfig::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    config.apply_env(env)?;
    Ok(config)
}
