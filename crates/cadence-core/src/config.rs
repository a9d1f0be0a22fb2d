use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, ValidationErrors};

pub const DEFAULT_APPLICATION: &str = "scheduler";
pub const DEFAULT_PORT: u16 = 4202;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PREFIX: &str = "/scheduler";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Top-level config (cadence.toml + CADENCE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadenceConfig {
    #[serde(default = "default_application")]
    pub application: String,
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Production mode always sends alerts; dev mode only when
    /// `slack.send_alerts_in_dev` is set.
    #[serde(default)]
    pub is_prod_mode: bool,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            application: default_application(),
            gateway: GatewayConfig::default(),
            is_prod_mode: false,
            database: DatabaseConfig::default(),
            slack: SlackConfig::default(),
            logger: LoggerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Path prefix every route is mounted under, e.g. `/scheduler/v1/task`.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: default_bind(),
            prefix: default_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Slack incoming-webhook used for terminal task failures.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SlackConfig {
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default)]
    pub send_alerts_in_dev: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_application() -> String {
    DEFAULT_APPLICATION.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cadence/cadence.db", home)
}

impl CadenceConfig {
    /// Load config from a TOML file with CADENCE_* env var overrides.
    ///
    /// Nested keys use a double underscore: `CADENCE_SLACK__WEBHOOK_URL`.
    /// A missing file is not an error; defaults fill every field.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: CadenceConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CADENCE_").split("__"))
            .extract()
            .map_err(|e| CadenceError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// True when a terminal failure should actually reach Slack.
    pub fn alerts_enabled(&self) -> bool {
        self.is_prod_mode || self.slack.send_alerts_in_dev
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut ve = ValidationErrors::new();
        if self.application.trim().is_empty() {
            ve.add("application", "cannot be empty");
        }
        if self.gateway.bind.trim().is_empty() {
            ve.add("gateway.bind", "cannot be empty");
        }
        if self.gateway.prefix.trim().is_empty() {
            ve.add("gateway.prefix", "cannot be empty");
        }
        if self.logger.level.trim().is_empty() {
            ve.add("logger.level", "cannot be empty");
        }
        if self.database.path.trim().is_empty() {
            ve.add("database.path", "cannot be empty");
        }
        if self.alerts_enabled() && self.slack.webhook_url.trim().is_empty() {
            ve.add("slack.webhook_url", "cannot be empty when alerts are enabled");
        }
        ve.into_result()
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cadence/cadence.toml", home)
}
