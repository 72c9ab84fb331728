//! Result rendering for the command line.
//!
//! Formats a `QueryResult` as an aligned text table or as JSON on stdout.

use crate::db::{QueryResult, Value};
use crate::error::{Result, ScopeqError};

/// Renders a result as an aligned text table with a row-count footer.
pub fn render_text(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return format!("({} rows)\n", result.row_count);
    }

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.name.len()).collect();
    let rendered: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(Value::to_display_string).collect())
        .collect();

    for row in &rendered {
        for (i, cell) in row.iter().enumerate() {
            if cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let mut out = String::new();

    let header: Vec<String> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:<width$}", c.name, width = widths[i]))
        .collect();
    out.push_str(&format!(" {}\n", header.join(" | ")));

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
    out.push_str(&format!("{}\n", rule.join("+")));

    for row in &rendered {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect();
        out.push_str(&format!(" {}\n", cells.join(" | ")));
    }

    out.push_str(&format!("({} rows)\n", result.row_count));
    out
}

/// Renders a result as a JSON array of column-to-value objects.
///
/// Duplicate column names keep the last value.
pub fn render_json(result: &QueryResult) -> Result<String> {
    let rows: Vec<serde_json::Value> = result
        .rows
        .iter()
        .map(|row| {
            let mut object = serde_json::Map::new();
            for (column, value) in result.columns.iter().zip(row.iter()) {
                object.insert(column.name.clone(), json_value(value));
            }
            serde_json::Value::Object(object)
        })
        .collect();

    serde_json::to_string_pretty(&rows)
        .map_err(|e| ScopeqError::internal(format!("failed to serialize result: {e}")))
}

fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        // Binary data has no faithful JSON form; report its size.
        Value::Bytes(b) => serde_json::Value::String(format!("<{} bytes>", b.len())),
    }
}
