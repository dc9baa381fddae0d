//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, path::PathBuf, sync::Arc, time::Duration};

use serde::Deserialize;

use super::types::{CategoryId, Res};

/// Default database endpoint (in-memory).
fn default_db_endpoint() -> String {
    "mem://".to_string()
}

/// Default database namespace.
fn default_db_namespace() -> String {
    "keyword".to_string()
}

/// Default database name.
fn default_db_database() -> String {
    "bot".to_string()
}

/// Default category used when no keyword matches.
fn default_fallback_category_id() -> CategoryId {
    5
}

/// Default prefix prepended to every reply.
fn default_reply_prefix() -> String {
    "->".to_string()
}

/// Default delay between reconnect attempts.
fn default_reconnect_delay_secs() -> u64 {
    3
}

/// Default interval between keepalive pings.
fn default_keepalive_interval_secs() -> u64 {
    30
}

/// Configuration for the keyword-bot application.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Slack app token (`SLACK_APP_TOKEN`).
    #[serde(default)]
    pub slack_app_token: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    #[serde(default)]
    pub slack_bot_token: String,
    /// Database endpoint URL (`DB_ENDPOINT`), e.g. `mem://` or `ws://localhost:8000`.
    #[serde(default = "default_db_endpoint")]
    pub db_endpoint: String,
    /// Database username (`DB_USERNAME`).
    #[serde(default)]
    pub db_username: Option<String>,
    /// Database password (`DB_PASSWORD`).
    #[serde(default)]
    pub db_password: Option<String>,
    /// Database namespace (`DB_NAMESPACE`).
    #[serde(default = "default_db_namespace")]
    pub db_namespace: String,
    /// Database name (`DB_DATABASE`).
    #[serde(default = "default_db_database")]
    pub db_database: String,
    /// Optional seed file with keyword rules and responses (`SEED_PATH`).
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
    /// Category answered when no keyword matches (`FALLBACK_CATEGORY_ID`).
    #[serde(default = "default_fallback_category_id")]
    pub fallback_category_id: CategoryId,
    /// Prefix prepended to every reply (`REPLY_PREFIX`).
    #[serde(default = "default_reply_prefix")]
    pub reply_prefix: String,
    /// Optional greeting sent when someone joins a conversation (`WELCOME_MESSAGE`).
    #[serde(default)]
    pub welcome_message: Option<String>,
    /// Seconds to wait between reconnect attempts (`RECONNECT_DELAY_SECS`).
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    /// Seconds between keepalive pings (`KEEPALIVE_INTERVAL_SECS`).
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            slack_app_token: String::new(),
            slack_bot_token: String::new(),
            db_endpoint: default_db_endpoint(),
            db_username: None,
            db_password: None,
            db_namespace: default_db_namespace(),
            db_database: default_db_database(),
            seed_path: None,
            fallback_category_id: default_fallback_category_id(),
            reply_prefix: default_reply_prefix(),
            welcome_message: None,
            reconnect_delay_secs: default_reconnect_delay_secs(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
        }
    }
}

impl ConfigInner {
    /// The fixed delay between reconnect attempts.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// The interval between keepalive pings.
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("KEYWORD_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Checks the values that `serde` cannot.
    pub fn validate(&self) -> Res<()> {
        if self.reconnect_delay_secs == 0 {
            return Err(anyhow::anyhow!("Reconnect delay must be at least one second."));
        }

        if self.keepalive_interval_secs == 0 {
            return Err(anyhow::anyhow!("Keepalive interval must be at least one second."));
        }

        Ok(())
    }

    /// Checks that the Slack credentials are present.
    pub fn validate_slack(&self) -> Res<()> {
        if self.slack_app_token.is_empty() || self.slack_bot_token.is_empty() {
            return Err(anyhow::anyhow!("Both `slack_app_token` and `slack_bot_token` must be set to run the bot."));
        }

        Ok(())
    }
}
