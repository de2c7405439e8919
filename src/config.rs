use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

fn default_cache_capacity() -> u64 {
    64
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    #[serde(default = "default_cache_capacity")]
    pub table_cache_capacity: u64,
    pub database_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            max_file_size: default_max_file_size(),
            table_cache_capacity: default_cache_capacity(),
            database_path: ":memory:".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let defaults = Config::default();
        Ok(Config {
            host: env_or("SHEET_INSIGHTS_HOST", defaults.host)?,
            port: env_or("SHEET_INSIGHTS_PORT", defaults.port)?,
            max_file_size: env_or("MAX_FILE_SIZE", defaults.max_file_size)?,
            table_cache_capacity: env_or("TABLE_CACHE_CAPACITY", defaults.table_cache_capacity)?,
            database_path: std::env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

pub fn load_config() -> Result<Config> {
    Config::from_env()
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}
