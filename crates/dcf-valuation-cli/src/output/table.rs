use serde_json::Value;
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
///
/// A full valuation response renders as a per-method summary plus the
/// Layer C readback; anything else falls back to a flat field/value table.
pub fn print_table(value: &Value) {
    if let Some(results) = value.get("results") {
        print_valuation_summary(value, results);
        return;
    }
    print_flat_object(value);
    print_warnings(value);
}

fn print_valuation_summary(envelope: &Value, results: &Value) {
    let mut builder = Builder::default();
    builder.push_record([
        "Method",
        "Fair Value",
        "Enterprise Value",
        "TV %",
        "MC P10",
        "MC P50",
        "MC P90",
        "Price Percentile",
    ]);

    for (label, key) in [
        ("Perpetuity", "perpetuity"),
        ("ROIC-driven", "roic_driven"),
        ("Fade", "fade"),
    ] {
        let method = &results[key];
        builder.push_record([
            label.to_string(),
            number_at(method, "/dcf/fair_value_per_share"),
            number_at(method, "/dcf/enterprise_value"),
            number_at(method, "/dcf/terminal_value_percent"),
            number_at(method, "/monte_carlo/p10"),
            number_at(method, "/monte_carlo/p50"),
            number_at(method, "/monte_carlo/p90"),
            number_at(method, "/monte_carlo/current_price_percentile"),
        ]);
    }
    println!("{}", Table::from(builder));

    if let Some(layer_c) = envelope.pointer("/validation/layer_c") {
        println!("\nMarket-implied (Layer C):");
        print_flat_object(layer_c);
    }

    print_warnings(envelope);
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    } else {
        println!("{}", value);
    }
}

fn print_warnings(envelope: &Value) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }
}

fn number_at(value: &Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .and_then(Value::as_f64)
        .map(|v| format!("{v:.2}"))
        .unwrap_or_default()
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
