pub mod error;
pub mod filters;
pub mod movie;

use std::fmt::Display;
use std::str::FromStr as _;
use std::time::Duration;

pub use error::Error;
pub use filters::{Filters, Metadata, SortSafelist};
pub use sqlx::Error as SqlxError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type ChosenRow = sqlx::sqlite::SqliteRow;
pub type Pool = sqlx::Pool<ChosenDB>;

/// Deadline applied to every single store round trip.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 25,
            idle_timeout: Duration::from_secs(15 * 60),
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

pub async fn new_pool(database_url: &str) -> Result<Pool, Error> {
    new_pool_with(database_url, &PoolSettings::default()).await
}

pub async fn new_pool_with(database_url: &str, settings: &PoolSettings) -> Result<Pool, Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .idle_timeout(settings.idle_timeout)
        .acquire_timeout(settings.acquire_timeout)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn migrate(pool: &Pool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    Asc(String),
    Desc(String),
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Order::Asc(s) => write!(f, "{} ASC", s),
            Order::Desc(s) => write!(f, "{} DESC", s),
        }
    }
}
