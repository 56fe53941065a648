//! Database primitives shared by the server and the product crates.
//!
//! Every store call goes through [`Store::run`], which bounds it with the
//! configured call timeout so a stalled connection surfaces as an error
//! instead of hanging the request.

use std::future::Future;
use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, SqlErr,
};
use thiserror::Error;

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing")]
    MissingUrl,
    #[error("failed to connect to database: {0}")]
    Connect(#[source] DbErr),
    #[error("database query failed: {0}")]
    Query(#[from] DbErr),
    #[error("database call timed out after {0:?}")]
    Timeout(Duration),
}

impl DbError {
    /// True when the failure is a unique-constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Query(err) => matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))),
            _ => false,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Environment-driven connection settings.
#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub call_timeout: Duration,
}

impl DatabaseSettings {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            call_timeout: Self::DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Reads `DATABASE_URL`, falling back to the `DB_*` component variables.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let url = match lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            Some(url) => url,
            None => compose_url(&lookup).ok_or(DbError::MissingUrl)?,
        };

        let mut settings = Self::new(url);
        if let Some(max) = lookup("DB_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
            settings.max_connections = max;
        }
        if let Some(secs) = lookup("DB_CONNECT_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            settings.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = lookup("DB_CALL_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            settings.call_timeout = Duration::from_secs(secs);
        }
        Ok(settings)
    }
}

fn compose_url(lookup: &impl Fn(&str) -> Option<String>) -> Option<String> {
    let name = lookup("DB_NAME")?;
    let user = lookup("DB_USER").unwrap_or_else(|| "postgres".into());
    let password = lookup("DB_PASSWORD").unwrap_or_default();
    let host = lookup("DB_HOST").unwrap_or_else(|| "localhost".into());
    let port = lookup("DB_PORT").unwrap_or_else(|| "5432".into());
    let auth = if password.is_empty() {
        user
    } else {
        format!("{user}:{password}")
    };
    Some(format!("postgres://{auth}@{host}:{port}/{name}"))
}

/// Open a pool using the given settings.
pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let mut options = ConnectOptions::new(settings.url.clone());
    options
        .max_connections(settings.max_connections)
        .connect_timeout(settings.connect_timeout)
        .sqlx_logging(false);
    Database::connect(options).await.map_err(DbError::Connect)
}

/// Pool handle plus the per-call timeout applied to every query.
#[derive(Clone, Debug)]
pub struct Store {
    pool: DbPool,
    call_timeout: Duration,
}

impl Store {
    pub fn new(pool: DbPool, call_timeout: Duration) -> Self {
        Self { pool, call_timeout }
    }

    pub fn conn(&self) -> &DbPool {
        &self.pool
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.pool.get_database_backend()
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Run a store operation, bounded by the call timeout.
    pub async fn run<T, F>(&self, op: F) -> DbResult<T>
    where
        F: Future<Output = Result<T, DbErr>>,
    {
        match tokio::time::timeout(self.call_timeout, op).await {
            Ok(result) => result.map_err(DbError::Query),
            Err(_) => {
                tracing::warn!(timeout = ?self.call_timeout, "database call timed out");
                Err(DbError::Timeout(self.call_timeout))
            }
        }
    }
}
