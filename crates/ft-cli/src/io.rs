use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde_json::Value;

/// Read a JSON document from a file, or from stdin when `path` is `-`.
pub fn read_json(path: &str) -> Result<Value, String> {
    let text = if path == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        buf
    } else {
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?
    };

    serde_json::from_str(&text).map_err(|e| format!("Invalid JSON in '{}': {}", path, e))
}

pub fn to_json_string(value: &Value, pretty: bool) -> Result<String, String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    text.map_err(|e| format!("Failed to serialize output: {}", e))
}

/// Write JSON to `path`, creating parent directories. Without a path the
/// document goes to stdout.
pub fn write_json(path: Option<&Path>, value: &Value, pretty: bool) -> Result<(), String> {
    let text = to_json_string(value, pretty)?;

    let Some(path) = path else {
        println!("{}", text);
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
    }
    fs::write(path, text).map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn writes_and_reads_back() {
        let dir = std::env::temp_dir().join(format!("ft-cli-io-{}", std::process::id()));
        let path = dir.join("nested").join("out.json");
        let value = json!({"items": [1, 2, 3]});

        write_json(Some(&path), &value, true).unwrap();
        let read = read_json(path.to_str().unwrap()).unwrap();
        assert_eq!(read, value);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_json("/nonexistent/ft-cli/settings.json").unwrap_err();
        assert!(err.starts_with("Failed to read"));
    }

    #[test]
    fn compact_and_pretty_output() {
        let value = json!({"a": 1});
        assert_eq!(to_json_string(&value, false).unwrap(), r#"{"a":1}"#);
        assert!(to_json_string(&value, true).unwrap().contains('\n'));
    }
}
