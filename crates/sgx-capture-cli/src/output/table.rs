use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
///
/// Scalar fields of the result go into a Field/Value table. Arrays of
/// objects (`top_trades`, ticker summaries) and keyed objects
/// (`highlight_map`) get their own tables underneath.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_object(res_map),
        Value::Array(arr) => print_array_table(arr),
        Value::Null => println!("(no result)"),
        other => println!("{}", format_value(other)),
    }

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

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_object(map: &Map<String, Value>) {
    // The offset grid has its own layout.
    if let (Some(Value::Array(sells)), Some(Value::Array(rows))) =
        (map.get("sell_offsets"), map.get("rows"))
    {
        print_scalars(map, &["sell_offsets", "rows", "best", "greedy"]);
        println!("\nGrid (rows: buy offset, columns: sell offset)");
        print_grid(sells, rows);
        for key in ["best", "greedy"] {
            if let Some(Value::Object(pnl)) = map.get(key) {
                println!("\n{}", key);
                print_scalars(pnl, &[]);
            }
        }
        return;
    }

    print_scalars(map, &[]);

    for (key, val) in map {
        match val {
            Value::Array(arr) if arr.iter().any(Value::is_object) => {
                println!("\n{}", key);
                print_array_table(arr);
            }
            Value::Object(inner) if inner.values().all(Value::is_object) && !inner.is_empty() => {
                println!("\n{}", key);
                print_keyed_table(inner);
            }
            _ => {}
        }
    }
}

/// Field/Value table of the non-nested fields in `map`.
fn print_scalars(map: &Map<String, Value>, skip: &[&str]) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if skip.contains(&key.as_str()) || is_nested(val) {
            continue;
        }
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn is_nested(value: &Value) -> bool {
    match value {
        Value::Array(arr) => arr.iter().any(Value::is_object),
        Value::Object(inner) => !inner.is_empty() && inner.values().all(Value::is_object),
        _ => false,
    }
}

fn print_grid(sells: &[Value], rows: &[Value]) {
    let mut builder = Builder::default();
    let mut header = vec!["buy \\ sell".to_string()];
    header.extend(sells.iter().map(|s| format!("D{:+}", s.as_i64().unwrap_or_default())));
    builder.push_record(header);

    for row in rows {
        let buy = row.get("buy_offset").and_then(Value::as_i64).unwrap_or_default();
        let mut record = vec![format!("D{:+}", buy)];
        if let Some(Value::Array(cells)) = row.get("cells") {
            record.extend(cells.iter().map(|c| match c {
                Value::Null => "-".to_string(),
                other => format_value(other),
            }));
        }
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}

fn print_keyed_table(map: &Map<String, Value>) {
    let Some(Value::Object(first)) = map.values().next() else {
        return;
    };
    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    let mut header_row = vec!["key".to_string()];
    header_row.extend(headers.iter().cloned());
    builder.push_record(header_row);

    for (key, item) in map {
        if let Value::Object(obj) = item {
            let mut row = vec![key.clone()];
            row.extend(
                headers
                    .iter()
                    .map(|h| obj.get(h.as_str()).map(format_value).unwrap_or_default()),
            );
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
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
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
