use serde_json::Value;

use super::cell_text;

/// Headline fields in priority order. Dotted paths reach into nested results.
const PRIORITY_PATHS: [&str; 9] = [
    "score.grade",
    "grade",
    "monthly_payment",
    "breakeven_rate_pct",
    "irr",
    "returns.irr",
    "noi",
    "annual_debt_service",
    "base_value",
];

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields in priority order, then falls back to
/// the first non-null field in the result object.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_text(value));
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(root, |node, key| node.as_object()?.get(key))
        .filter(|v| !v.is_null())
}

fn minimal_text(value: &Value) -> String {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(found) = PRIORITY_PATHS.iter().find_map(|p| lookup(result, p)) {
        return cell_text(found);
    }

    match result {
        Value::Object(map) => match map.iter().find(|(_, v)| !v.is_null()) {
            Some((key, val)) => format!("{}: {}", key, cell_text(val)),
            None => String::new(),
        },
        Value::Array(arr) => format!("{} rows", arr.len()),
        other => cell_text(other),
    }
}
