//! CSV rendering of JSON dataset records
//!
//! The header is the union of record keys in first-seen order. Fields are
//! quoted per RFC 4180; nested values are written as JSON text.

use indexmap::IndexSet;
use serde_json::Value;

/// Renders records as CSV with CRLF line endings
///
/// Non-object records are rendered under a single `value` column.
pub fn render_csv(records: &[Value]) -> String {
    let mut columns: IndexSet<String> = IndexSet::new();
    for record in records {
        match record {
            Value::Object(map) => columns.extend(map.keys().cloned()),
            _ => {
                columns.insert("value".to_string());
            }
        }
    }

    if columns.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    push_row(&mut out, columns.iter().map(String::as_str).map(escape_field));

    for record in records {
        let cells = columns.iter().map(|column| {
            let value = match record {
                Value::Object(map) => map.get(column),
                other if column == "value" => Some(other),
                _ => None,
            };
            escape_field(&cell_text(value))
        });
        push_row(&mut out, cells);
    }

    out
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>) {
    let row: Vec<String> = cells.collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

/// Quotes a field if it contains a delimiter, quote or line break
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
