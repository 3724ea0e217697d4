use colored::Colorize;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{display_value, row_section};

/// Format output as tables: headline fields first, then any per-loan or
/// per-month rows.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::Object(result)) = map.get("result") {
                print_result(result);
                print_envelope_notes(map);
            } else {
                print_result(map);
            }
        }
        Value::Array(arr) => print_rows("", arr),
        _ => println!("{}", display_value(value)),
    }
}

fn print_result(result: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in result {
        if matches!(val, Value::Array(rows) if rows.first().is_some_and(Value::is_object)) {
            continue;
        }
        builder.push_record([key.as_str(), &display_value(val)]);
    }
    println!("{}", Table::from(builder));

    if let Some((key, rows)) = row_section(result) {
        println!();
        print_rows(key, rows);
    }
}

fn print_rows(section: &str, rows: &[Value]) {
    if rows.is_empty() {
        println!("(empty)");
        return;
    }

    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            println!("{}", display_value(item));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let numbered = section == "loans";
    let mut builder = Builder::default();

    let mut header_row = Vec::with_capacity(headers.len() + 1);
    if numbered {
        header_row.push("loan".to_string());
    }
    header_row.extend(headers.iter().cloned());
    builder.push_record(header_row);

    for (i, item) in rows.iter().enumerate() {
        if let Value::Object(map) = item {
            let mut row = Vec::with_capacity(headers.len() + 1);
            if numbered {
                row.push(format!("Loan #{}", i + 1));
            }
            row.extend(
                headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(display_value).unwrap_or_default()),
            );
            builder.push_record(row);
        }
    }

    println!("{}", Table::from(builder));
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\n{}", "Warnings:".yellow().bold());
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
