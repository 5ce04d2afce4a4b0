use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{cell_text, nested_tables};

/// Format output as tables using the tabled crate.
///
/// Scalar result fields go in a Field/Value table; arrays of rows such as
/// projection years or grid points get a table of their own.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result(result);
                print_envelope_notes(map);
            } else {
                print_object(map, None);
            }
        }
        Value::Array(arr) => print_rows(arr),
        _ => println!("{}", cell_text(value)),
    }
}

fn print_result(result: &Value) {
    match result {
        Value::Object(map) => print_object(map, None),
        Value::Array(arr) => print_rows(arr),
        other => println!("{}", cell_text(other)),
    }
}

fn print_object(map: &Map<String, Value>, title: Option<&str>) {
    if let Some(title) = title {
        println!("\n{}:", title);
    }

    let tables = nested_tables(map);
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut scalar_rows = 0;
    let mut sections = Vec::new();
    for (key, val) in map {
        if tables.iter().any(|(k, _)| *k == key.as_str()) {
            continue;
        }
        match val {
            // Sections such as `returns` or a sensitivity grid
            Value::Object(inner) if !nested_tables(inner).is_empty() || inner.len() > 2 => {
                sections.push((key.as_str(), inner));
            }
            _ => {
                builder.push_record([key.as_str(), &cell_text(val)]);
                scalar_rows += 1;
            }
        }
    }
    if scalar_rows > 0 {
        println!("{}", Table::from(builder));
    }

    for (name, inner) in sections {
        print_object(inner, Some(name));
    }
    for (name, rows) in tables {
        println!("\n{}:", name);
        print_rows(rows);
    }
}

fn print_rows(arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(cell_text).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", cell_text(item));
        }
    }
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
