use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

// Root configuration, one section per concern
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_seconds: u64,
}

// Reservation listing page sizes
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationConfig {
    pub page_size: u32,
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            max_page_size: 100,
        }
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn or_default(key: &'static str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    parse_value(key, &or_default(key, default))
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let pagination = PaginationConfig {
            page_size: parsed("RESERVATION_PAGE_SIZE", "10")?,
            max_page_size: parsed("RESERVATION_MAX_PAGE_SIZE", "100")?,
        };
        if pagination.page_size == 0 || pagination.page_size > pagination.max_page_size {
            return Err(ConfigError::Invalid {
                key: "RESERVATION_PAGE_SIZE",
                value: pagination.page_size.to_string(),
            });
        }

        Ok(Config {
            app: AppConfig {
                host: or_default("HOST", "0.0.0.0"),
                port: parsed("PORT", "8000")?,
                environment: or_default("ENVIRONMENT", "development"),
                rust_log: or_default("RUST_LOG", "planetarium_booking=debug,tower_http=debug"),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parsed("DB_POOL_SIZE", "20")?,
                acquire_timeout_seconds: parsed("DB_ACQUIRE_TIMEOUT_SECONDS", "5")?,
            },
            pagination,
        })
    }
}
