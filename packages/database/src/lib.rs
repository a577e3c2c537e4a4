#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Connection pool, schema bootstrap, and queries for the incident store.
//!
//! Uses `switchy_database` with raw SQL. `PostgreSQL` is the production
//! backend; `SQLite` is supported for local runs and tests. The only
//! correctness invariant the ingestor relies on is the `unique_incident`
//! constraint over `(type, latitude, longitude, message)`.

pub mod db;
pub mod pool;
pub mod queries;

pub use pool::{ConnectionPool, PooledConnection};

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Could not open a connection to the store.
    #[error("Connection error: {message}")]
    Connect {
        /// Description of what went wrong.
        message: String,
    },

    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// I/O error (creating the `SQLite` directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// SQL flavour spoken by the connections in a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    /// `PostgreSQL` (`$n` placeholders).
    Postgres,
    /// `SQLite` (`?` placeholders).
    Sqlite,
}

const CREATE_TABLE_POSTGRES: &str = "CREATE TABLE IF NOT EXISTS traffic_incidents (
    id BIGSERIAL PRIMARY KEY,
    type TEXT NOT NULL,
    latitude DOUBLE PRECISION NOT NULL,
    longitude DOUBLE PRECISION NOT NULL,
    message TEXT NOT NULL,
    impact_score BIGINT,
    ai_analysis TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT unique_incident UNIQUE (type, latitude, longitude, message)
)";

const CREATE_TABLE_SQLITE: &str = "CREATE TABLE IF NOT EXISTS traffic_incidents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    message TEXT NOT NULL,
    impact_score INTEGER,
    ai_analysis TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    CONSTRAINT unique_incident UNIQUE (type, latitude, longitude, message)
)";

/// Creates the `traffic_incidents` table and its `unique_incident`
/// constraint if they don't already exist.
///
/// Existing tables are left untouched; there is no versioned migration
/// runner.
///
/// # Errors
///
/// Returns [`DbError`] if the DDL fails.
pub async fn ensure_schema(pool: &ConnectionPool) -> Result<(), DbError> {
    let ddl = match pool.dialect() {
        SqlDialect::Postgres => CREATE_TABLE_POSTGRES,
        SqlDialect::Sqlite => CREATE_TABLE_SQLITE,
    };

    pool.acquire().await.exec_raw(ddl).await?;
    log::info!("Incident schema is ready ({:?})", pool.dialect());
    Ok(())
}
