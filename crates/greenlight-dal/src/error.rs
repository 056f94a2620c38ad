use std::time::Duration;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Edit conflict on record {id}, version {version} is stale")]
    EditConflict { id: i64, version: i64 },

    #[error("Invalid order by field: {0}")]
    InvalidOrderByField(String),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),
}
