//! scopeq - tenant- and user-scoped SQL execution for PostgreSQL.
//!
//! Applies an explicit access scope to a statement through session-local
//! configuration on a single pooled connection, and guarantees the scope
//! never leaks to other operations sharing the pool.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod output;
pub mod scope;
pub mod sql;
