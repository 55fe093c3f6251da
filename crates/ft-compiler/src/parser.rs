use serde_json::{Map, Value};

use ft_core::{ChannelFilter, ChannelMap, FilterFlags, KeywordFilter};

const FLAG_KEYS: [&str; 4] = ["hideAllShorts", "hideAllComments", "filterComments", "useSemanticMatching"];

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings must be an object, got {0}")]
    NotAnObject(&'static str),
}

/// Typed settings, before optimization and compilation.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub keywords: Vec<KeywordFilter>,
    pub channels: Vec<ChannelFilter>,
    pub flags: FilterFlags,
    pub channel_map: ChannelMap,
}

/// Strict entry point: the text must be a settings object, or a JSON string
/// holding one.
pub fn parse_settings_str(text: &str) -> Result<Settings, SettingsError> {
    let value: Value = serde_json::from_str(text)?;
    let value = match value {
        Value::String(inner) => serde_json::from_str(&inner)?,
        other => other,
    };

    match &value {
        Value::Object(map) => Ok(parse_object(map)),
        other => Err(SettingsError::NotAnObject(value_kind(other))),
    }
}

/// Lenient entry point: anything that is not a settings object yields
/// default settings.
pub fn parse_settings(raw: &Value) -> Settings {
    match raw {
        Value::Object(map) => parse_object(map),
        Value::String(text) => parse_settings_str(text).unwrap_or_else(|e| {
            log::warn!("Ignoring serialized settings: {e}");
            Settings::default()
        }),
        Value::Null => Settings::default(),
        other => {
            log::warn!("Ignoring settings of type {}", value_kind(other));
            Settings::default()
        }
    }
}

fn parse_object(map: &Map<String, Value>) -> Settings {
    let mut flags = FilterFlags::empty();
    for key in FLAG_KEYS {
        if let Some(flag) = FilterFlags::from_setting_key(key) {
            flags.set(flag, parse_flag(map.get(key)));
        }
    }

    Settings {
        keywords: map.get("filterKeywords").map(parse_keyword_list).unwrap_or_default(),
        channels: map.get("filterChannels").map(parse_channel_list).unwrap_or_default(),
        flags,
        channel_map: map.get("channelMap").map(parse_channel_map).unwrap_or_default(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Split a legacy comma/newline separated list.
fn split_legacy_list(text: &str) -> impl Iterator<Item = &str> {
    text.split([',', '\n']).map(str::trim).filter(|s| !s.is_empty())
}

// =============================================================================
// Keywords
// =============================================================================

fn parse_keyword_list(value: &Value) -> Vec<KeywordFilter> {
    match value {
        Value::Array(items) => items.iter().filter_map(parse_keyword_entry).collect(),
        Value::String(text) => split_legacy_list(text).filter_map(parse_keyword_str).collect(),
        Value::Null => Vec::new(),
        other => {
            log::warn!("Ignoring filterKeywords of type {}", value_kind(other));
            Vec::new()
        }
    }
}

/// `/pattern/flags` literal, when the trailing part is made of regex flags.
fn split_regex_literal(text: &str) -> Option<(&str, &str)> {
    let body = text.strip_prefix('/')?;
    let end = body.rfind('/')?;
    let (pattern, flags) = (&body[..end], &body[end + 1..]);
    if pattern.is_empty() || !flags.chars().all(|c| "gimsuy".contains(c)) {
        return None;
    }
    Some((pattern, flags))
}

fn parse_keyword_str(text: &str) -> Option<KeywordFilter> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    match split_regex_literal(trimmed) {
        Some((pattern, flags)) => Some(KeywordFilter::from_regex(pattern, flags)),
        None => Some(KeywordFilter::new(trimmed, false)),
    }
}

pub fn parse_keyword_entry(value: &Value) -> Option<KeywordFilter> {
    match value {
        Value::String(text) => parse_keyword_str(text),
        Value::Object(map) => {
            if let Some(pattern) = map.get("pattern").and_then(Value::as_str) {
                let flags = map.get("flags").and_then(Value::as_str).unwrap_or("");
                let mut keyword = KeywordFilter::from_regex(pattern, flags);
                if let Some(comments) = map.get("comments").and_then(Value::as_bool) {
                    keyword.comments = comments;
                }
                return Some(keyword);
            }

            match serde_json::from_value::<KeywordFilter>(value.clone()) {
                Ok(keyword) if keyword.word.trim().is_empty() => None,
                Ok(keyword) => Some(keyword),
                Err(e) => {
                    log::warn!("Dropping malformed keyword entry: {e}");
                    None
                }
            }
        }
        Value::Null => None,
        other => {
            log::warn!("Dropping keyword entry of type {}", value_kind(other));
            None
        }
    }
}

// =============================================================================
// Channels
// =============================================================================

fn parse_channel_list(value: &Value) -> Vec<ChannelFilter> {
    match value {
        Value::Array(items) => items.iter().filter_map(parse_channel_entry).collect(),
        Value::String(text) => split_legacy_list(text).filter_map(ChannelFilter::from_legacy).collect(),
        Value::Null => Vec::new(),
        other => {
            log::warn!("Ignoring filterChannels of type {}", value_kind(other));
            Vec::new()
        }
    }
}

pub fn parse_channel_entry(value: &Value) -> Option<ChannelFilter> {
    match value {
        Value::String(text) => ChannelFilter::from_legacy(text),
        Value::Object(_) => match serde_json::from_value::<ChannelFilter>(value.clone()) {
            Ok(filter) => Some(filter),
            Err(e) => {
                log::warn!("Dropping malformed channel entry: {e}");
                None
            }
        },
        Value::Null => None,
        other => {
            log::warn!("Dropping channel entry of type {}", value_kind(other));
            None
        }
    }
}

fn parse_channel_map(value: &Value) -> ChannelMap {
    let Value::Object(map) = value else {
        return ChannelMap::new();
    };

    map.iter()
        .filter_map(|(key, value)| value.as_str().map(|v| (key.as_str(), v)))
        .collect()
}
