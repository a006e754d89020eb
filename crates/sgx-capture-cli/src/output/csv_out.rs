use serde_json::{Map, Value};
use std::io;

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// The offset grid is written as a matrix and highlight rankings as one
/// row per trade; anything else becomes two-column field/value rows.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => write_result_csv(&mut wtr, result),
            Some(Value::Array(results)) => write_array_csv(&mut wtr, results),
            Some(Value::Null) => {}
            _ => write_fields_csv(&mut wtr, map),
        },
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_result_csv(wtr: &mut StdoutWriter<'_>, result: &Map<String, Value>) {
    if let (Some(Value::Array(sells)), Some(Value::Array(rows))) =
        (result.get("sell_offsets"), result.get("rows"))
    {
        write_grid_csv(wtr, sells, rows);
    } else if let Some(Value::Array(trades)) = result.get("top_trades") {
        // Full per-ticker ranking is more useful than the top three.
        match result.get("highlight_map") {
            Some(Value::Object(map)) if !map.is_empty() => {
                let rows: Vec<Value> = map.values().cloned().collect();
                write_array_csv(wtr, &rows);
            }
            _ => write_array_csv(wtr, trades),
        }
    } else {
        write_fields_csv(wtr, result);
    }
}

fn write_fields_csv(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_grid_csv(wtr: &mut StdoutWriter<'_>, sells: &[Value], rows: &[Value]) {
    let mut header = vec!["buy_offset".to_string()];
    header.extend(sells.iter().map(format_csv_value));
    let _ = wtr.write_record(&header);

    for row in rows {
        let mut record = vec![row.get("buy_offset").map(format_csv_value).unwrap_or_default()];
        if let Some(Value::Array(cells)) = row.get("cells") {
            record.extend(cells.iter().map(format_csv_value));
        }
        let _ = wtr.write_record(&record);
    }
}

fn write_array_csv(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
