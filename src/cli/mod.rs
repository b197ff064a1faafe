use serde::Serialize;
use serde_json::Value;

/// True when `CIVIC_OUTPUT=json` asks for raw JSON instead of tables.
pub fn json_output() -> bool {
    std::env::var("CIVIC_OUTPUT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false)
}

/// Render a list of records as an ASCII table restricted to `columns`
/// (JSON field names, e.g. `createdAt`). Empty input yields a "(none)" line.
pub fn records_table<T: Serialize>(records: &[T], columns: &[&str]) -> String {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            let v = serde_json::to_value(r).unwrap_or(Value::Null);
            columns.iter().map(|c| to_cell_string(v.get(*c).unwrap_or(&Value::Null))).collect()
        })
        .collect();
    if rows.is_empty() { return "(none)".to_string(); }
    render_table(columns, &rows)
}

/// Print records as a table, or as pretty JSON when requested.
pub fn print_records<T: Serialize>(records: &[T], columns: &[&str]) {
    if json_output() {
        println!("{}", serde_json::to_string_pretty(records).unwrap_or_default());
    } else {
        println!("{}", records_table(records, columns));
    }
}

/// Print a single value as `key: value` lines, or JSON when requested.
pub fn print_record<T: Serialize>(record: &T) {
    let v = serde_json::to_value(record).unwrap_or(Value::Null);
    if json_output() {
        println!("{}", serde_json::to_string_pretty(&v).unwrap_or_default());
        return;
    }
    match v {
        Value::Object(map) => {
            let width = map.keys().map(|k| k.chars().count()).max().unwrap_or(0);
            for (k, val) in map.iter() {
                println!("{:width$}  {}", k, to_cell_string(val), width = width);
            }
        }
        other => println!("{}", to_cell_string(&other)),
    }
}

pub fn render_table(cols: &[&str], rows: &[Vec<String>]) -> String {
    let max_col_width: usize = 48; // cap to keep output readable
    let mut widths: Vec<usize> = cols.iter().map(|s| s.chars().count().min(max_col_width)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = cell.chars().count();
            if w > widths[i] { widths[i] = w.min(max_col_width); }
        }
    }
    let header: Vec<String> = cols.iter().map(|c| c.to_string()).collect();
    let sep = build_separator(&widths);
    let mut out = Vec::with_capacity(rows.len() + 5);
    out.push(sep.clone());
    out.push(build_row(&header, &widths));
    out.push(sep.clone());
    for r in rows { out.push(build_row(r, &widths)); }
    out.push(sep);
    out.push(format!("rows: {}", rows.len()));
    out.join("\n")
}

fn to_cell_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        // nested collections (issue responses) are summarized by count
        Value::Array(a) => a.len().to_string(),
        other => other.to_string(),
    }
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let text = truncate(&cell, *w);
        let pad = w.saturating_sub(text.chars().count());
        s.push(' ');
        if is_numeric_like(&cell) {
            s.push_str(&" ".repeat(pad));
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&" ".repeat(pad));
        }
        s.push(' ');
        s.push('|');
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    !st.is_empty() && st.chars().all(|c| c.is_ascii_digit())
}
