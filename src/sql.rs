//! SQL quoting for scope values.
//!
//! The single boundary through which scope identifiers and literals are
//! formatted into SQL text. Nothing else in the crate builds SQL from
//! untrusted strings.

/// Quotes a string as a SQL string literal.
///
/// Embedded single quotes are doubled. Strings containing backslashes use
/// the `E'...'` form with backslashes doubled, so the result is safe
/// regardless of the server's `standard_conforming_strings` setting.
pub fn escape_literal(s: &str) -> String {
    if s.contains('\\') {
        format!("E'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
    } else {
        format!("'{}'", s.replace('\'', "''"))
    }
}

/// Quotes a string as a SQL identifier.
///
/// The result is always double-quoted, with embedded double quotes doubled,
/// so keywords, mixed case, and punctuation all come out as plain names.
pub fn escape_identifier(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}
