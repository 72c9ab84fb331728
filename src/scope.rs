//! Access scope for a query.
//!
//! A [`Scope`] names the tenant and/or user context a statement runs under.
//! It is plain data: its only job is to produce the session-context
//! preamble executed ahead of the caller's statement on the same leased
//! connection.

use crate::config::ScopeSettings;
use crate::error::{Result, ScopeqError};
use crate::sql::{escape_identifier, escape_literal};

/// The access context applied to one query execution.
///
/// Four shapes are possible: no scope, user only, tenant only, or both.
/// The tenant dimension names a schema resolved through `search_path`; the
/// user dimension is published as a session variable for row-level-security
/// policies to read. Identifiers are trimmed; an identifier that is empty
/// after trimming is rejected when the preamble is built, before any
/// connection is leased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    tenant: Option<String>,
    user: Option<String>,
}

impl Scope {
    /// A scope with no tenant and no user: the statement runs with the
    /// connection's ambient context untouched.
    pub fn none() -> Self {
        Self::default()
    }

    /// A user-only scope.
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            tenant: None,
            user: Some(id.into()),
        }
    }

    /// A tenant-only scope. The identifier is the schema relations resolve in.
    pub fn tenant(schema: impl Into<String>) -> Self {
        Self {
            tenant: Some(schema.into()),
            user: None,
        }
    }

    /// A scope carrying both dimensions.
    pub fn tenant_user(schema: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            tenant: Some(schema.into()),
            user: Some(id.into()),
        }
    }

    /// The tenant schema, if this scope carries one.
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    /// The user identifier, if this scope carries one.
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Returns true if neither dimension is present.
    pub fn is_empty(&self) -> bool {
        self.tenant.is_none() && self.user.is_none()
    }

    /// Builds the session-context statements for this scope.
    ///
    /// One statement per dimension present, tenant first, then user. All
    /// values pass through the quoting boundary in [`crate::sql`].
    pub fn preamble(&self, settings: &ScopeSettings) -> Result<Vec<String>> {
        let mut statements = Vec::with_capacity(2);

        if let Some(tenant) = &self.tenant {
            let tenant = tenant.trim();
            if tenant.is_empty() {
                return Err(ScopeqError::scope("tenant identifier is empty"));
            }
            let mut stmt = format!("SET search_path = {}", escape_identifier(tenant));
            if settings.include_public {
                stmt.push_str(", public");
            }
            statements.push(stmt);
        }

        if let Some(user) = &self.user {
            let user = user.trim();
            if user.is_empty() {
                return Err(ScopeqError::scope("user identifier is empty"));
            }
            statements.push(format!(
                "SET {} = {}",
                quote_variable(&settings.user_variable)?,
                escape_literal(user)
            ));
        }

        Ok(statements)
    }
}

/// Quotes a dotted session-variable name segment by segment.
///
/// `app.user_id` becomes `"app"."user_id"`. The variable name comes from
/// configuration, not from the caller, but it crosses the same quoting
/// boundary as everything else.
fn quote_variable(name: &str) -> Result<String> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(ScopeqError::config(format!(
            "invalid session variable name: '{name}'"
        )));
    }
    Ok(segments
        .iter()
        .map(|s| escape_identifier(s.trim()))
        .collect::<Vec<_>>()
        .join("."))
}
