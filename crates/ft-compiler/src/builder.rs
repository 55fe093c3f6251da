use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use ft_core::{FilterFlags, FilterState};

use crate::cache::CacheContext;
use crate::optimizer::{optimize_settings, OptimizeStats};
use crate::parser::{parse_settings, Settings};

/// Summary of one normalization, for logs and diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeReport {
    pub keywords: usize,
    pub dropped_keywords: usize,
    pub channels: usize,
    pub unresolved_handles: Vec<String>,
    pub channel_map_entries: usize,
    pub hide_all_shorts: bool,
    pub hide_all_comments: bool,
    pub filter_comments: bool,
    pub optimize: OptimizeStats,
}

/// Compile already-optimized settings, reusing cached structures.
pub fn build_filter_state(settings: &Settings, cache: &mut CacheContext, owner: Option<&str>) -> FilterState {
    FilterState {
        keywords: cache.compiled_keywords(owner, &settings.keywords),
        channels: cache.channel_index(owner, &settings.channels),
        channel_map: Arc::new(settings.channel_map.clone()),
        flags: settings.flags,
    }
}

/// Raw settings to filter state. Never fails; invalid entries are dropped.
pub fn normalize_settings(raw: &Value, cache: &mut CacheContext, owner: Option<&str>) -> (FilterState, NormalizeReport) {
    let mut settings = parse_settings(raw);
    let optimize = optimize_settings(&mut settings);
    let state = build_filter_state(&settings, cache, owner);

    let report = NormalizeReport {
        keywords: state.keywords.len(),
        dropped_keywords: state.keywords.dropped(),
        channels: state.channels.len(),
        unresolved_handles: state.channels.unresolved_handle_keys().to_vec(),
        channel_map_entries: state.channel_map.len(),
        hide_all_shorts: state.flags.contains(FilterFlags::HIDE_ALL_SHORTS),
        hide_all_comments: state.flags.contains(FilterFlags::HIDE_ALL_COMMENTS),
        filter_comments: state.flags.contains(FilterFlags::FILTER_COMMENTS),
        optimize,
    };

    if report.dropped_keywords > 0 {
        log::warn!("{} keyword patterns could not be compiled", report.dropped_keywords);
    }

    (state, report)
}
