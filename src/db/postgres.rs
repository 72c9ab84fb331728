//! PostgreSQL scoped executor.
//!
//! Implements the `ScopedClient` trait over a sqlx connection pool. Each
//! execution leases one connection, applies the scope preamble, runs the
//! caller's statement, and clears session state before the connection
//! rejoins the pool.

use crate::config::{ConnectionConfig, PoolSettings, ScopeSettings};
use crate::db::{ColumnInfo, QueryResult, Row, ScopedClient, Value};
use crate::error::{Result, ScopeqError};
use crate::scope::Scope;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column as SqlxColumn, Connection, Postgres, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Maximum number of connection attempts at pool creation.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Clears session-local configuration before a connection rejoins the pool.
/// `DISCARD ALL` would also drop prepared statements the pool still caches,
/// so only run-time parameters are reset.
const RESET_SESSION: &str = "RESET ALL";

/// PostgreSQL scoped query executor.
#[derive(Debug, Clone)]
pub struct PostgresExecutor {
    pool: PgPool,
    settings: ScopeSettings,
}

impl PostgresExecutor {
    /// Connects a new pool using the given connection and pool settings.
    ///
    /// Transient failures (server still starting, connection refused, timeouts)
    /// are retried with exponential backoff; authentication and
    /// missing-database failures are not.
    pub async fn connect(
        config: &ConnectionConfig,
        settings: ScopeSettings,
        pool_settings: &PoolSettings,
    ) -> Result<Self> {
        let conn_str = config.to_connection_string()?;

        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = PgPoolOptions::new()
                .max_connections(pool_settings.max_connections)
                .acquire_timeout(pool_settings.acquire_timeout())
                .connect(&conn_str)
                .await;

            match result {
                Ok(pool) => {
                    debug!("Successfully connected to database");
                    return Ok(Self { pool, settings });
                }
                Err(e) if attempt < MAX_RETRY_ATTEMPTS && is_transient_error(&e) => {
                    warn!(
                        "Connection attempt {} failed (transient error), retrying in {:?}",
                        attempt, delay
                    );
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    last_error = Some(e);
                    break;
                }
            }
        }

        Err(map_connection_error(
            last_error.expect("at least one attempt was made"),
            config,
        ))
    }

    /// Wraps an existing connection pool.
    ///
    /// This is primarily useful for testing.
    pub fn from_pool(pool: PgPool, settings: ScopeSettings) -> Self {
        Self { pool, settings }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the preamble then the caller's statement on one leased
    /// connection, returning only the caller statement's rows.
    async fn run_scoped(
        conn: &mut PoolConnection<Postgres>,
        preamble: &[String],
        sql: &str,
    ) -> Result<Vec<PgRow>> {
        for stmt in preamble {
            debug!("applying scope: {stmt}");
            // Preamble text varies per scope value; keep it out of the
            // prepared statement cache.
            sqlx::query(stmt.as_str())
                .persistent(false)
                .execute(&mut **conn)
                .await
                .map_err(|e| ScopeqError::query(format_query_error(e)))?;
        }

        sqlx::query(sql)
            .fetch_all(&mut **conn)
            .await
            .map_err(|e| ScopeqError::query(format_query_error(e)))
    }
}

#[async_trait]
impl ScopedClient for PostgresExecutor {
    async fn execute(&self, scope: &Scope, sql: &str) -> Result<QueryResult> {
        // Reject invalid scopes before touching the pool.
        let preamble = scope.preamble(&self.settings)?;

        let start = Instant::now();
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| ScopeqError::acquire(e.to_string()))?;

        let outcome = Self::run_scoped(&mut conn, &preamble, sql).await;

        // The connection must never rejoin the pool with scope state still
        // applied, success or not. If the reset itself fails, close the
        // connection instead of returning it.
        if !preamble.is_empty() {
            if let Err(e) = sqlx::query(RESET_SESSION).execute(&mut *conn).await {
                warn!("failed to reset session state, closing connection: {e}");
                let _ = conn.detach().close().await;
            }
        }

        let pg_rows = outcome?;
        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = pg_rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        let rows: Vec<Row> = pg_rows.iter().map(convert_row).collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
///
/// Types without a native mapping (timestamps, uuids, numerics, ...) decode
/// through their text representation.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    let value = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool),
        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v.into())),
        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v.into())),
        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int),
        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v.into())),
        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float),
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes),
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String),
    };

    value.unwrap_or(Value::Null)
}

/// Determines if a connection error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    let msg = error.to_string().to_lowercase();

    // Authentication and missing-database errors never resolve on their own.
    if msg.contains("authentication failed")
        || msg.contains("does not exist")
        || msg.contains("ssl")
        || msg.contains("tls")
    {
        return false;
    }

    msg.contains("connection refused")
        || msg.contains("timed out")
        || msg.contains("timeout")
        || msg.contains("temporarily unavailable")
        || msg.contains("connection reset")
        || msg.contains("broken pipe")
}

/// Maps sqlx connection errors to user-actionable messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> ScopeqError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let msg = error.to_string().to_lowercase();

    if msg.contains("connection refused") || msg.contains("could not connect") {
        ScopeqError::acquire(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if msg.contains("authentication failed") {
        let user = config.user.as_deref().unwrap_or("unknown");
        ScopeqError::acquire(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if msg.contains("does not exist") && msg.contains("database") {
        let database = config.database.as_deref().unwrap_or("unknown");
        ScopeqError::acquire(format!("Database '{database}' does not exist."))
    } else if msg.contains("ssl") || msg.contains("tls") {
        ScopeqError::acquire("Server requires SSL. Add '?sslmode=require' to the connection string.")
    } else if msg.contains("timed out") || msg.contains("timeout") {
        ScopeqError::acquire(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        ScopeqError::acquire(error.to_string())
    }
}

/// Formats a database error with detail and hint context when available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = format!("ERROR: {}", db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
        if let Some(constraint) = pg_error.constraint() {
            result.push_str("\n  CONSTRAINT: ");
            result.push_str(constraint);
        }
    }

    result
}
