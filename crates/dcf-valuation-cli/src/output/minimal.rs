use serde_json::Value;

/// Print just the key answer value from the output.
///
/// For a valuation response that is the perpetuity fair value per share;
/// other payloads fall back to a priority list, then the first field.
pub fn print_minimal(value: &Value) {
    if let Some(v) = value.pointer("/results/perpetuity/dcf/fair_value_per_share") {
        println!("{}", format_minimal(v));
        return;
    }

    let priority_keys = [
        "fair_value_per_share",
        "final_wacc",
        "implied_growth_rate",
        "enterprise_value",
        "equity_value",
        "p50",
    ];

    if let Value::Object(map) = value {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(value));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
