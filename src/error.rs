//! Error types for scopeq.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for scoped query operations.
#[derive(Error, Debug)]
pub enum ScopeqError {
    /// The pool could not supply a connection (exhausted, unreachable, timed out).
    #[error("Acquire error: {0}")]
    Acquire(String),

    /// The database reported a failure for the preamble or the caller statement
    /// (syntax errors, constraint violations, missing relations, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// The scope carried an invalid identifier (empty tenant or user id).
    #[error("Scope error: {0}")]
    Scope(String),

    /// Configuration errors (invalid config file, bad connection string, CLI usage).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (unexpected states, bugs).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScopeqError {
    /// Creates an acquire error with the given message.
    pub fn acquire(msg: impl Into<String>) -> Self {
        Self::Acquire(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a scope error with the given message.
    pub fn scope(msg: impl Into<String>) -> Self {
        Self::Scope(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Acquire(_) => "Acquire Error",
            Self::Query(_) => "Query Error",
            Self::Scope(_) => "Scope Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using ScopeqError.
pub type Result<T> = std::result::Result<T, ScopeqError>;
