//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub format: FormatConfig,

    #[serde(default)]
    pub x: XConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// ID of the account to watch
    #[serde(default)]
    pub account: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,

    #[serde(default = "default_thread_fetch_limit")]
    pub thread_fetch_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    #[serde(default = "default_true")]
    pub jitter: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatConfig {
    #[serde(default = "default_tag")]
    pub tag: String,

    #[serde(default = "default_link_base")]
    pub link_base: String,

    #[serde(default = "default_link_label")]
    pub link_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XConfig {
    #[serde(default = "default_x_bearer_token_env")]
    pub bearer_token_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_bot_token_env")]
    pub bot_token_env: String,

    /// Destination channel, e.g. "-1001234567890"
    #[serde(default)]
    pub chat_id: String,
}

// Default value functions
fn default_state_path() -> PathBuf {
    PathBuf::from("./seen_posts.txt")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> u64 {
    300
}

fn default_fetch_limit() -> u32 {
    10
}

fn default_thread_fetch_limit() -> u32 {
    50
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    2000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_tag() -> String {
    "#x".to_string()
}

fn default_link_base() -> String {
    "https://twitter.com/user/status".to_string()
}

fn default_link_label() -> String {
    "Go to post".to_string()
}

fn default_x_bearer_token_env() -> String {
    "X_BEARER_TOKEN".to_string()
}

fn default_telegram_bot_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            poll_interval_secs: default_poll_interval(),
            fetch_limit: default_fetch_limit(),
            thread_fetch_limit: default_thread_fetch_limit(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_factor: default_backoff_factor(),
            jitter: default_true(),
        }
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            link_base: default_link_base(),
            link_label: default_link_label(),
        }
    }
}

impl Default for XConfig {
    fn default() -> Self {
        Self {
            bearer_token_env: default_x_bearer_token_env(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token_env: default_telegram_bot_token_env(),
            chat_id: String::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("THREAD_RELAY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r##"# thread-relay configuration

[general]
state_path = "./seen_posts.txt"
log_level = "info"
dry_run = false

[watch]
# Numeric ID of the X account to mirror
account = ""
poll_interval_secs = 300
fetch_limit = 10
thread_fetch_limit = 50

[retry]
max_attempts = 5
initial_delay_ms = 2000
backoff_factor = 2.0
jitter = true

[format]
tag = "#x"
link_base = "https://twitter.com/user/status"
link_label = "Go to post"

[x]
bearer_token_env = "X_BEARER_TOKEN"

[telegram]
bot_token_env = "TELEGRAM_BOT_TOKEN"
# e.g. "-1001234567890"
chat_id = ""
"##
        .to_string()
    }
}
