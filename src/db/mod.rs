//! Database layer for scopeq.
//!
//! Provides a trait-based interface for scoped query execution, with a
//! PostgreSQL implementation over a connection pool and an in-memory mock
//! for tests and offline runs.

mod mock;
mod postgres;
mod types;

pub use mock::MockScopedClient;
pub use postgres::PostgresExecutor;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::{ConnectionConfig, PoolSettings, ScopeSettings};
use crate::error::Result;
use crate::scope::Scope;
use async_trait::async_trait;

/// Trait defining the interface for scoped query clients.
///
/// One call is one logical operation: lease a connection, apply the scope,
/// run the statement, clear the session, release the connection.
#[async_trait]
pub trait ScopedClient: Send + Sync {
    /// Executes `sql` under `scope` and returns only the rows the caller's
    /// statement produced.
    async fn execute(&self, scope: &Scope, sql: &str) -> Result<QueryResult>;

    /// Closes the underlying pool.
    async fn close(&self) -> Result<()>;
}

/// Connects to PostgreSQL and boxes the executor behind the client trait.
///
/// This is the central factory function for database connections.
pub async fn connect(
    config: &ConnectionConfig,
    scope_settings: ScopeSettings,
    pool_settings: &PoolSettings,
) -> Result<Box<dyn ScopedClient>> {
    let client = PostgresExecutor::connect(config, scope_settings, pool_settings).await?;
    Ok(Box::new(client))
}
