use std::{fmt::Display, str::FromStr, sync::Arc, time::Duration};

use greenlight_dal::{filters::DEFAULT_PAGE_SIZE, SortSafelist, DEFAULT_QUERY_TIMEOUT};
use serde::Serialize;
use sqlx::Pool;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool<sqlx::Sqlite>) -> Self {
        AppState {
            state: Arc::new(AppStateInner { app_config, pool }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn pool(&self) -> &Pool<sqlx::Sqlite> {
        &self.state.pool
    }
}

struct AppStateInner {
    pool: Pool<sqlx::Sqlite>,
    app_config: AppConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(format!(
                "invalid environment {other}, expected development, staging or production"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub version: String,
    pub default_page_size: i64,
    pub query_timeout: Duration,
    pub sort_safelist: SortSafelist,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            environment: Environment::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            sort_safelist: SortSafelist::movies(),
        }
    }
}
