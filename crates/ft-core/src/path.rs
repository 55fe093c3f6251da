//! Path extraction over JSON trees
//!
//! Field paths are dotted strings with numeric segments for array indexes
//! (`shortBylineText.runs.0.text`, bracket form `runs[0]` also accepted).
//! Text leaves come in several layouts which `flatten_text` collapses into a
//! single string.

use serde_json::Value;

/// Split a path into its segments.
#[inline]
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['.', '[', ']']).filter(|segment| !segment.is_empty())
}

/// Resolve a path against a value. Missing keys, out-of-range indexes and
/// type mismatches all yield `None`.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments(path) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Collapse a text leaf into one string.
///
/// Accepted layouts: a plain string, `{simpleText}`, `{runs: [{text}]}`,
/// `{content}` (view models), `{text}`, or a bare run list.
pub fn flatten_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("simpleText") {
                s.clone()
            } else if let Some(runs) = map.get("runs") {
                flatten_text(runs)?
            } else if let Some(Value::String(s)) = map.get("content") {
                s.clone()
            } else if let Some(inner) = map.get("text") {
                flatten_text(inner)?
            } else {
                return None;
            }
        }
        Value::Array(items) => items.iter().filter_map(flatten_text).collect::<String>(),
        _ => return None,
    };

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// First path whose value flattens to non-empty text.
pub fn first_text(root: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| get_path(root, path))
        .find_map(flatten_text)
}

/// First path whose value is a non-empty string.
pub fn first_string(root: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| get_path(root, path))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_path() {
        let value = json!({"a": {"runs": [{"text": "x"}, {"text": "y"}]}});
        assert_eq!(get_path(&value, "a.runs.1.text"), Some(&json!("y")));
        assert_eq!(get_path(&value, "a.runs[0].text"), Some(&json!("x")));
        assert_eq!(get_path(&value, "a.runs.5.text"), None);
        assert_eq!(get_path(&value, "a.runs.first"), None);
        assert_eq!(get_path(&value, "a.runs.0.text.deeper"), None);
        assert_eq!(get_path(&value, ""), Some(&value));
    }

    #[test]
    fn test_flatten_text_layouts() {
        assert_eq!(flatten_text(&json!("plain")).as_deref(), Some("plain"));
        assert_eq!(flatten_text(&json!({"simpleText": "simple"})).as_deref(), Some("simple"));
        assert_eq!(
            flatten_text(&json!({"runs": [{"text": "Hello "}, {"text": "World"}]})).as_deref(),
            Some("Hello World")
        );
        assert_eq!(flatten_text(&json!({"content": "vm"})).as_deref(), Some("vm"));
        assert_eq!(flatten_text(&json!({"text": {"content": "nested"}})).as_deref(), Some("nested"));
        assert_eq!(flatten_text(&json!({"runs": []})), None);
        assert_eq!(flatten_text(&json!("   ")), None);
        assert_eq!(flatten_text(&json!(42)), None);
    }

    #[test]
    fn test_first_text_falls_through() {
        let value = json!({"title": {"runs": []}, "headline": {"simpleText": "Fallback"}});
        assert_eq!(first_text(&value, &["missing", "title", "headline"]).as_deref(), Some("Fallback"));
        assert_eq!(first_text(&value, &["missing"]), None);
    }

    #[test]
    fn test_first_string_ignores_objects() {
        let value = json!({"a": {"b": 1}, "c": "UCx", "d": ""});
        assert_eq!(first_string(&value, &["a", "d", "c"]).as_deref(), Some("UCx"));
    }
}
