pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Placeholder shown in text outputs for an absent value (e.g. no payoff date).
pub const MISSING: &str = "—";

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Render a scalar for text outputs. Tagged objects such as a repayment
/// status collapse to their `kind`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => MISSING.to_string(),
        Value::Array(arr) => arr.iter().map(display_value).collect::<Vec<_>>().join(", "),
        Value::Object(map) => match map.get("kind") {
            Some(Value::String(kind)) => kind.replace('_', " "),
            _ => serde_json::to_string(value).unwrap_or_default(),
        },
    }
}

/// The first array of row objects in a result (`loans`, `rows` or `errors`).
pub fn row_section(result: &serde_json::Map<String, Value>) -> Option<(&str, &[Value])> {
    ["loans", "rows", "errors"].iter().find_map(|key| match result.get(*key) {
        Some(Value::Array(rows)) if rows.first().is_some_and(Value::is_object) => {
            Some((*key, rows.as_slice()))
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_value_placeholders() {
        assert_eq!(display_value(&Value::Null), MISSING);
        assert_eq!(display_value(&json!({"kind": "paid_off", "months": 120})), "paid off");
        assert_eq!(display_value(&json!("112.92")), "112.92");
    }

    #[test]
    fn test_row_section_prefers_loans() {
        let v = json!({"loans": [{"monthly_payment": "1"}], "rows": []});
        let (key, rows) = row_section(v.as_object().unwrap()).unwrap();
        assert_eq!(key, "loans");
        assert_eq!(rows.len(), 1);
    }
}
