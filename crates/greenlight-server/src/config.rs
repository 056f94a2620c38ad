use std::time::Duration;

use crate::error::Result;
pub use clap::Parser;
use greenlight_app::state::{AppConfig, Environment};
use greenlight_dal::{PoolSettings, SortSafelist};
use url::Url;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 4000,
        env = "GREENLIGHT_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,

    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "GREENLIGHT_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        default_value = "development",
        env = "GREENLIGHT_ENV",
        help = "Environment (development|staging|production)"
    )]
    pub env: Environment,

    #[arg(
        long,
        env = "GREENLIGHT_BASE_URL",
        default_value = "http://localhost:4000",
        help = "Base URL of the server, as visible to clients"
    )]
    pub base_url: Url,

    #[arg(
        long,
        env = "GREENLIGHT_DATABASE_URL",
        default_value = "sqlite://greenlight.db",
        help = "Database URL e.g. sqlite://file.db, file is created if missing"
    )]
    pub database_url: String,

    #[arg(
        long,
        env = "GREENLIGHT_DB_MAX_CONNECTIONS",
        default_value_t = 25,
        help = "Maximum open database connections"
    )]
    pub db_max_connections: u32,

    #[arg(
        long,
        env = "GREENLIGHT_DB_MAX_IDLE_TIME",
        default_value = "15m",
        help = "Maximum database connection idle time in human friendly format (e.g. 15m, 1h 30s)",
        value_parser = humantime::parse_duration
    )]
    pub db_max_idle_time: Duration,

    #[arg(
        long,
        env = "GREENLIGHT_QUERY_TIMEOUT",
        default_value = "3s",
        help = "Deadline for a single database operation",
        value_parser = humantime::parse_duration
    )]
    pub query_timeout: Duration,

    #[arg(
        long,
        env = "GREENLIGHT_DEFAULT_PAGE_SIZE",
        default_value_t = 20,
        help = "Page size used when the client does not ask for one"
    )]
    pub default_page_size: i64,

    #[arg(long, env = "GREENLIGHT_CORS", help = "Enable permissive CORS")]
    pub cors: bool,
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.db_max_connections,
            idle_timeout: self.db_max_idle_time,
            ..Default::default()
        }
    }
}

impl From<&ServerConfig> for AppConfig {
    fn from(config: &ServerConfig) -> Self {
        AppConfig {
            environment: config.env,
            version: env!("CARGO_PKG_VERSION").to_string(),
            default_page_size: config.default_page_size,
            query_timeout: config.query_timeout,
            sort_safelist: SortSafelist::movies(),
        }
    }
}
