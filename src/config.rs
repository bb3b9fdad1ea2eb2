//! Client configuration.
//!
//! Values are layered, later layers winning:
//! 1. the built-in profile for the selected [`Environment`]
//! 2. `config.json` in the user's config directory (`hatchling/config.json`)
//! 3. `HATCHLING_*` environment variables
//!
//! The CLI applies its own flags on top.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::fetch::FetchPolicy;
use crate::models::Session;
use crate::timeline::{StatusPolicy, DEFAULT_GRACE_MINUTES};

const APP_NAME: &str = "hatchling";
const CONFIG_FILE: &str = "config.json";

const DEFAULT_USER_ID: &str = "test_user_123";
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Deployment the client talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "development" => Some(Self::Development),
            "production" => Some(Self::Production),
            "test" => Some(Self::Test),
            _ => None,
        }
    }

    fn base_url(&self) -> &'static str {
        match self {
            Self::Development | Self::Test => "http://localhost:5000",
            Self::Production => "https://hatchling-backend.onrender.com",
        }
    }

    fn timeout_ms(&self) -> u64 {
        match self {
            Self::Development => 10_000,
            Self::Production => 15_000,
            Self::Test => 5_000,
        }
    }

    fn retry_attempts(&self) -> u32 {
        match self {
            Self::Development => 3,
            Self::Production => 5,
            Self::Test => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HatchlingConfig {
    pub environment: Environment,
    pub base_url: String,
    /// Bearer token, if the backend requires one.
    pub api_key: Option<String>,
    pub user_id: String,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub poll_interval_ms: u64,
    /// In-progress grace window for entries with only a start time.
    pub grace_minutes: i64,
    /// Serve the built-in sample day when the backend is unreachable.
    pub offline_demo: bool,
}

impl Default for HatchlingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

/// On-disk overrides; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub environment: Option<Environment>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub user_id: Option<String>,
    pub timeout_ms: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub grace_minutes: Option<i64>,
    pub offline_demo: Option<bool>,
}

impl HatchlingConfig {
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            base_url: environment.base_url().to_string(),
            api_key: None,
            user_id: DEFAULT_USER_ID.to_string(),
            timeout_ms: environment.timeout_ms(),
            retry_attempts: environment.retry_attempts(),
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            grace_minutes: DEFAULT_GRACE_MINUTES,
            offline_demo: false,
        }
    }

    /// Load from the default config file and the process environment.
    ///
    /// An unreadable config file is logged and skipped; a malformed
    /// environment variable is an error.
    pub fn load() -> Result<Self> {
        let file = match default_config_path() {
            Ok(path) => match load_file(&path) {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!("Failed to load config, using defaults: {:#}", e);
                    None
                }
            },
            Err(e) => {
                tracing::debug!("No config directory: {}", e);
                None
            }
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Build from an optional file layer and an environment lookup.
    pub fn resolve(
        file: Option<ConfigFile>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file = file.unwrap_or_default();

        let environment = match env("HATCHLING_ENV") {
            Some(value) => Environment::from_str(value.trim())
                .with_context(|| format!("HATCHLING_ENV: unknown environment '{}'", value))?,
            None => file.environment.unwrap_or_default(),
        };

        let mut config = Self::for_environment(environment);
        config.apply_file(file);
        config.apply_env(&env)?;
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.api_key {
            self.api_key = Some(v);
        }
        if let Some(v) = file.user_id {
            self.user_id = v;
        }
        if let Some(v) = file.timeout_ms {
            self.timeout_ms = v;
        }
        if let Some(v) = file.retry_attempts {
            self.retry_attempts = v;
        }
        if let Some(v) = file.retry_delay_ms {
            self.retry_delay_ms = v;
        }
        if let Some(v) = file.poll_interval_ms {
            self.poll_interval_ms = v;
        }
        if let Some(v) = file.grace_minutes {
            self.grace_minutes = v;
        }
        if let Some(v) = file.offline_demo {
            self.offline_demo = v;
        }
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = env("HATCHLING_API_URL") {
            self.base_url = v;
        }
        if let Some(v) = env("HATCHLING_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = env("HATCHLING_USER_ID") {
            self.user_id = v;
        }
        if let Some(v) = parse_env(env, "HATCHLING_TIMEOUT_MS")? {
            self.timeout_ms = v;
        }
        if let Some(v) = parse_env(env, "HATCHLING_RETRY_ATTEMPTS")? {
            self.retry_attempts = v;
        }
        if let Some(v) = parse_env(env, "HATCHLING_RETRY_DELAY_MS")? {
            self.retry_delay_ms = v;
        }
        if let Some(v) = parse_env(env, "HATCHLING_POLL_INTERVAL_MS")? {
            self.poll_interval_ms = v;
        }
        if let Some(v) = parse_env(env, "HATCHLING_GRACE_MINUTES")? {
            self.grace_minutes = v;
        }
        if let Some(v) = parse_env(env, "HATCHLING_OFFLINE_DEMO")? {
            self.offline_demo = v;
        }
        Ok(())
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.retry_attempts,
            base_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn status_policy(&self) -> StatusPolicy {
        StatusPolicy::with_grace_minutes(self.grace_minutes)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn session(&self) -> Session {
        Session::new(self.user_id.clone())
    }

    /// Write the current values as a config file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{}: invalid value '{}'", key, raw))
        })
        .transpose()
}

/// Read a config file. A missing file is `Ok(None)`.
pub fn load_file(path: &Path) -> Result<Option<ConfigFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    let file = serde_json::from_str(&content).context("Failed to parse config file")?;
    Ok(Some(file))
}

pub fn default_config_path() -> Result<PathBuf> {
    let mut path =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
