use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::adapters::HttpServerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => bail!("unknown log format {other:?}, expected \"pretty\" or \"json\""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub store_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://todos.db".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_connections: 5,
            store_timeout: Duration::from_millis(5000),
            log_format: LogFormat::Pretty,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| anyhow::anyhow!("{e}"))
                .with_context(|| format!("invalid value {raw:?} for {key}"))
        })
        .transpose()
}

impl AppConfig {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "PORT")? {
            config.port = port;
        }
        if let Some(max) = parse_var::<u32>(&lookup, "DB_MAX_CONNECTIONS")? {
            if max == 0 {
                bail!("DB_MAX_CONNECTIONS must be at least 1");
            }
            config.max_connections = max;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "STORE_TIMEOUT_MS")? {
            if ms == 0 {
                bail!("STORE_TIMEOUT_MS must be at least 1");
            }
            config.store_timeout = Duration::from_millis(ms);
        }
        if let Some(format) = parse_var(&lookup, "LOG_FORMAT")? {
            config.log_format = format;
        }
        Ok(config)
    }

    pub fn http(&self) -> HttpServerConfig {
        HttpServerConfig {
            host: self.host.clone(),
            port: self.port,
        }
    }
}
