//! Mock scoped client for testing.
//!
//! Provides an in-memory implementation that echoes the applied scope back,
//! so front-end plumbing can be exercised without a server.

use super::{ColumnInfo, QueryResult, ScopedClient, Value};
use crate::error::Result;
use crate::scope::Scope;
use async_trait::async_trait;
use std::time::Duration;

/// A mock client that answers SELECTs with the scope it was given.
#[derive(Debug, Default)]
pub struct MockScopedClient;

impl MockScopedClient {
    /// Creates a new mock client.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScopedClient for MockScopedClient {
    async fn execute(&self, scope: &Scope, sql: &str) -> Result<QueryResult> {
        // Validate the scope exactly like the real executor would.
        scope.preamble(&crate::config::ScopeSettings::default())?;

        let mut result = if sql.trim_start().to_uppercase().starts_with("SELECT") {
            // One row mirroring what `current_setting` would report.
            let to_value = |id: Option<&str>| {
                id.map(|s| Value::String(s.to_string())).unwrap_or(Value::Null)
            };
            QueryResult::with_data(
                vec![
                    ColumnInfo::new("tenant", "text"),
                    ColumnInfo::new("user_id", "text"),
                ],
                vec![vec![to_value(scope.tenant_id()), to_value(scope.user_id())]],
            )
        } else {
            QueryResult::default()
        };

        result.execution_time = Duration::from_millis(1);
        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
