//! Typed configuration surface: a YAML file parsed into these structs, with
//! environment-variable overrides applied afterward. Schema validation is
//! deliberately minimal -- the configuration loader is an ambient concern,
//! not the interesting part of this crate.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub protocol: ProtocolConfig,
    pub database: DatabaseConfig,
    pub authentication: AuthenticationConfig,
    pub market: MarketConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_clients: usize,
    pub buffer_size: usize,
    #[serde(default)]
    pub environments: std::collections::HashMap<String, EnvironmentOverride>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentOverride {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    pub version: i32,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    pub message_rate_limit: u32,
}

fn default_encoding() -> String {
    "latin-1".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticationConfig {
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub username: String,
    pub password: String,
    pub account_id: String,
    pub account_type: String,
    pub initial_balance: f64,
    #[serde(default = "default_currency")]
    pub base_currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    pub symbols: Vec<String>,
}

impl Config {
    /// Load configuration from `path`, then apply `IB_SIM_*` environment
    /// overrides, then resolve `host`/`port` for the named environment (if
    /// any) over the top-level `server.host`/`server.port`.
    pub fn load(path: &Path, env: Option<&str>) -> Result<Config> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file at {}", path.display()))?;
        let mut config: Config =
            serde_yaml::from_str(&raw).with_context(|| "parsing config YAML")?;

        config.apply_env_overrides();
        config.apply_environment(env);

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("IB_SIM_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("IB_SIM_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(path) = std::env::var("IB_SIM_DB_PATH") {
            self.database.path = path;
        }
    }

    fn apply_environment(&mut self, env: Option<&str>) {
        let Some(env) = env else { return };
        if let Some(over) = self.server.environments.get(env) {
            self.server.host = over.host.clone();
            self.server.port = over.port;
        }
    }
}
