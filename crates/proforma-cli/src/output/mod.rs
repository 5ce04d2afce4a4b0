pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Single-cell text for a value. Tagged states such as
/// `{"status": "ratio", "value": "1.31"}` collapse to their payload, or to the
/// status when there is none.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) if arr.iter().all(is_scalar) => {
            arr.iter().map(cell_text).collect::<Vec<_>>().join(", ")
        }
        Value::Object(map) => match tagged_payload(map) {
            Some(text) => text,
            None => serde_json::to_string(value).unwrap_or_default(),
        },
        Value::Array(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

fn tagged_payload(map: &serde_json::Map<String, Value>) -> Option<String> {
    let status = map.get("status")?.as_str()?;
    if map.len() > 2 {
        return None;
    }
    match map.iter().find(|(k, _)| k.as_str() != "status") {
        Some((_, payload)) if is_scalar(payload) => Some(cell_text(payload)),
        Some(_) => None,
        None => Some(status.to_string()),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Fields of `obj` that hold a non-empty array of objects, in order.
pub fn nested_tables(obj: &serde_json::Map<String, Value>) -> Vec<(&str, &[Value])> {
    obj.iter()
        .filter_map(|(k, v)| match v {
            Value::Array(arr) if !arr.is_empty() && arr.iter().all(Value::is_object) => {
                Some((k.as_str(), arr.as_slice()))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_state_collapses() {
        assert_eq!(cell_text(&json!({"status": "ratio", "value": "1.31"})), "1.31");
        assert_eq!(cell_text(&json!({"status": "not_applicable"})), "not_applicable");
        assert_eq!(cell_text(&json!({"status": "converged", "rate": "0.041"})), "0.041");
    }

    #[test]
    fn test_plain_values() {
        assert_eq!(cell_text(&json!("F")), "F");
        assert_eq!(cell_text(&json!(null)), "");
        assert_eq!(cell_text(&json!(["-646000", "-8040.40"])), "-646000, -8040.40");
    }

    #[test]
    fn test_nested_tables_found() {
        let v = json!({"years": [{"year": 0}], "loan_amount": "1", "tags": ["a"]});
        let tables = nested_tables(v.as_object().unwrap());
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].0, "years");
    }
}
