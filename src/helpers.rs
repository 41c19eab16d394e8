//! Small helpers shared by the query layer and the pipeline's logging.

use std::collections::HashMap;

/// Parse the boolean spellings the query layer accepts ("1", "t", "TRUE",
/// "0", "f", "False", ...). Returns `None` for anything else.
pub fn parse_bool_value(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Parse a boolean query parameter. A key present with no value
/// (`?allow_duplicates`) counts as true; an unparseable value counts
/// as false.
pub fn parse_bool_param(query: &HashMap<String, String>, name: &str) -> bool {
    match query.get(name) {
        Some(v) if v.is_empty() => true,
        Some(v) => parse_bool_value(v).unwrap_or(false),
        None => false,
    }
}

/// Just the title, or "title a.k.a. english title" when both exist.
pub fn full_anime_title(title: &str, english: Option<&str>) -> String {
    match english {
        Some(e) if !e.is_empty() => format!("{} a.k.a. {}", title, e),
        _ => title.to_string(),
    }
}
