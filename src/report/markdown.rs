//! Markdown rendering helpers

use serde_json::Value;

/// Scalar as report text; strings are unquoted, null is `N/A`
pub fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Make text safe for a single table cell
pub fn cell(text: &str) -> String {
    text.replace('|', "\\|")
        .replace("\r\n", " ")
        .replace('\n', " ")
}

/// `yes` / `no`
pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Render structured details as nested bullet lists
///
/// Objects nest one level deeper per key; arrays list scalar items directly
/// and expand object items in place.
pub fn details(lines: &mut Vec<String>, value: &Value, indent: usize) {
    let prefix = "  ".repeat(indent);
    let Value::Object(map) = value else {
        lines.push(format!("{}- {}", prefix, scalar(value)));
        return;
    };

    for (key, value) in map {
        match value {
            Value::Object(_) => {
                lines.push(format!("{}- **{}**:", prefix, key));
                details(lines, value, indent + 1);
            }
            Value::Array(items) => {
                lines.push(format!("{}- **{}**:", prefix, key));
                for item in items {
                    match item {
                        Value::Object(_) => details(lines, item, indent + 1),
                        other => lines.push(format!("{}  - {}", prefix, scalar(other))),
                    }
                }
            }
            other => lines.push(format!("{}- **{}**: {}", prefix, key, scalar(other))),
        }
    }
}

/// Pretty JSON inside a fenced block
pub fn json_block(lines: &mut Vec<String>, value: &Value) {
    lines.push("```json".to_string());
    lines.push(serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()));
    lines.push("```\n".to_string());
}
