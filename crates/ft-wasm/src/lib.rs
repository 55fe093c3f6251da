//! WebAssembly bindings for FilterTube
//!
//! The content script feeds settings and intercepted payloads through these
//! functions; the DOM fallback and the block menu use the single-decision
//! probes so both enforcement points agree.

use std::cell::RefCell;

use ft_compiler::parser::parse_channel_entry;
use ft_compiler::{normalize_settings, CacheContext, NormalizeReport};
use ft_core::{
    canonicalize_channel_input, channel_matches_filter, ChannelIdentity, FilterOutcome, FilterState,
};
use serde_json::Value;
use wasm_bindgen::prelude::*;

/// Cache owner for the settings object held by this module.
const SETTINGS_OWNER: &str = "settings";

#[derive(Default)]
struct EngineState {
    filter: FilterState,
    cache: CacheContext,
    initialized: bool,
}

thread_local! {
    static ENGINE: RefCell<EngineState> = RefCell::new(EngineState::default());
}

// =============================================================================
// Logging
// =============================================================================

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = JsValue::from_str(&format!("[FilterTube] {}", record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&message),
            log::Level::Warn => web_sys::console::warn_1(&message),
            log::Level::Info => web_sys::console::info_1(&message),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&message),
        }
    }

    fn flush(&self) {}
}

/// Route `log` records to the browser console. Defaults to `warn`.
#[wasm_bindgen]
pub fn init_logging(level: Option<String>) {
    let filter = level
        .as_deref()
        .and_then(|l| l.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Warn);

    // A second call only changes the level
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(filter);
}

// =============================================================================
// Engine Operations
// =============================================================================

fn apply_settings(json: &str) -> Result<NormalizeReport, String> {
    let raw: Value = serde_json::from_str(json).map_err(|e| format!("Invalid settings JSON: {e}"))?;

    ENGINE.with(|engine| {
        let mut engine = engine.borrow_mut();
        let engine = &mut *engine;
        let (state, report) = normalize_settings(&raw, &mut engine.cache, Some(SETTINGS_OWNER));
        engine.filter = state;
        engine.initialized = true;
        Ok(report)
    })
}

fn filter_payload(json: &str) -> Result<(String, FilterOutcome), String> {
    let payload: Value = serde_json::from_str(json).map_err(|e| format!("Invalid payload JSON: {e}"))?;
    let outcome = ENGINE.with(|engine| engine.borrow().filter.filter(&payload));
    let data = match &outcome.value {
        Some(value) => serde_json::to_string(value),
        None => serde_json::to_string(&Value::Null),
    }
    .map_err(|e| format!("Failed to serialize payload: {e}"))?;
    Ok((data, outcome))
}

fn parse_identity(json: &str) -> Result<ChannelIdentity, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid channel identity: {e}"))
}

fn identity_matches(identity_json: &str, filter_json: &str) -> Result<bool, String> {
    let identity = parse_identity(identity_json)?;
    let raw: Value = serde_json::from_str(filter_json).map_err(|e| format!("Invalid channel filter: {e}"))?;
    let Some(filter) = parse_channel_entry(&raw) else {
        return Ok(false);
    };
    Ok(ENGINE.with(|engine| channel_matches_filter(&identity, &filter, &engine.borrow().filter.channel_map)))
}

// =============================================================================
// Exports
// =============================================================================

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    ENGINE.with(|engine| engine.borrow().initialized)
}

/// Replace the active settings. Returns a normalization report.
#[wasm_bindgen]
pub fn set_settings(json: &str) -> Result<JsValue, JsValue> {
    let report = apply_settings(json).map_err(|e| JsValue::from_str(&e))?;

    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"keywords".into(), &JsValue::from(report.keywords as u32));
    let _ = js_sys::Reflect::set(&result, &"droppedKeywords".into(), &JsValue::from(report.dropped_keywords as u32));
    let _ = js_sys::Reflect::set(&result, &"channels".into(), &JsValue::from(report.channels as u32));
    let _ = js_sys::Reflect::set(&result, &"channelMapEntries".into(), &JsValue::from(report.channel_map_entries as u32));
    let _ = js_sys::Reflect::set(&result, &"derivedKeywords".into(), &JsValue::from(report.optimize.derived_keywords as u32));
    let _ = js_sys::Reflect::set(&result, &"duplicateKeywords".into(), &JsValue::from(report.optimize.duplicate_keywords as u32));
    let _ = js_sys::Reflect::set(&result, &"duplicateChannels".into(), &JsValue::from(report.optimize.duplicate_channels as u32));
    let _ = js_sys::Reflect::set(&result, &"hideAllShorts".into(), &JsValue::from(report.hide_all_shorts));
    let _ = js_sys::Reflect::set(&result, &"hideAllComments".into(), &JsValue::from(report.hide_all_comments));
    let _ = js_sys::Reflect::set(&result, &"filterComments".into(), &JsValue::from(report.filter_comments));

    Ok(result.into())
}

/// Filter a serialized payload. The result holds the filtered data, the
/// removal count and a per-reason breakdown.
#[wasm_bindgen]
pub fn filter_json(json: &str) -> Result<JsValue, JsValue> {
    let (data, outcome) = filter_payload(json).map_err(|e| JsValue::from_str(&e))?;

    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"data".into(), &js_sys::JSON::parse(&data)?);
    let _ = js_sys::Reflect::set(&result, &"removed".into(), &JsValue::from(outcome.removed as u32));

    let reasons = js_sys::Object::new();
    for (reason, count) in outcome.reasons.iter() {
        let _ = js_sys::Reflect::set(&reasons, &reason.as_str().into(), &JsValue::from(count as u32));
    }
    let _ = js_sys::Reflect::set(&result, &"reasons".into(), &reasons);

    Ok(result.into())
}

#[wasm_bindgen]
pub fn is_channel_blocked(identity_json: &str) -> Result<bool, JsValue> {
    let identity = parse_identity(identity_json).map_err(|e| JsValue::from_str(&e))?;
    Ok(ENGINE.with(|engine| engine.borrow().filter.is_channel_blocked(&identity)))
}

/// Match one identity against one filter entry (string or object form).
#[wasm_bindgen]
pub fn channel_matches(identity_json: &str, filter_json: &str) -> Result<bool, JsValue> {
    identity_matches(identity_json, filter_json).map_err(|e| JsValue::from_str(&e))
}

#[wasm_bindgen]
pub fn text_matches(text: &str) -> bool {
    ENGINE.with(|engine| engine.borrow().filter.text_matches(text))
}

#[wasm_bindgen]
pub fn comment_text_matches(text: &str) -> bool {
    ENGINE.with(|engine| engine.borrow().filter.comment_text_matches(text))
}

#[wasm_bindgen]
pub fn canonicalize_channel(raw: &str) -> JsValue {
    let canonical = canonicalize_channel_input(raw);

    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"type".into(), &JsValue::from_str(canonical.kind.as_str()));
    let _ = js_sys::Reflect::set(&result, &"value".into(), &JsValue::from_str(&canonical.value));
    result.into()
}

/// Handles of channel filters that still lack a UC-id.
#[wasm_bindgen]
pub fn unresolved_handles() -> js_sys::Array {
    ENGINE.with(|engine| {
        engine
            .borrow()
            .filter
            .channels
            .unresolved_handle_keys()
            .iter()
            .map(|handle| JsValue::from_str(handle))
            .collect()
    })
}

#[wasm_bindgen]
pub fn cache_stats() -> JsValue {
    let stats = ENGINE.with(|engine| engine.borrow().cache.stats());

    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"listHits".into(), &JsValue::from(stats.list_hits as u32));
    let _ = js_sys::Reflect::set(&result, &"ownerHits".into(), &JsValue::from(stats.owner_hits as u32));
    let _ = js_sys::Reflect::set(&result, &"keywordCompiles".into(), &JsValue::from(stats.keyword_compiles as u32));
    let _ = js_sys::Reflect::set(&result, &"indexBuilds".into(), &JsValue::from(stats.index_builds as u32));
    result.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_core::BlockReason;

    #[test]
    fn settings_then_filter() {
        let report = apply_settings(r#"{"filterKeywords": ["spoiler"], "hideAllShorts": true}"#).unwrap();
        assert_eq!(report.keywords, 1);

        let (data, outcome) = filter_payload(
            r#"{"items": [
                {"videoRenderer": {"title": {"simpleText": "Huge spoiler"}}},
                {"reelItemRenderer": {"videoId": "r1"}},
                {"videoRenderer": {"title": {"simpleText": "Fine"}}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(outcome.removed, 2);
        assert_eq!(outcome.reasons.get(BlockReason::Shorts), 1);
        assert_eq!(data, r#"{"items":[{"videoRenderer":{"title":{"simpleText":"Fine"}}}]}"#);
    }

    #[test]
    fn rejects_bad_json() {
        assert!(apply_settings("{nope").is_err());
        assert!(filter_payload("[").is_err());
        assert!(parse_identity("42").is_err());
    }

    #[test]
    fn pairwise_channel_probe() {
        apply_settings("{}").unwrap();
        assert!(identity_matches(r#"{"name": "BadChannel"}"#, r#""@BadChannel""#).unwrap());
        assert!(identity_matches(r#"{"handle": "@x"}"#, r#"{"handle": "@X"}"#).unwrap());
        assert!(!identity_matches(r#"{"handle": "@x"}"#, r#"{}"#).unwrap());
        assert!(!identity_matches(r#"{"handle": "@x"}"#, "null").unwrap());
    }
}
