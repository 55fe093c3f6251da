//! Channel Match Engine
//!
//! Decides whether an observed channel identity matches a channel filter.
//! Both sides are normalized into a `ChannelKey` first, then compared with a
//! fixed ladder (first success wins):
//!
//! 1. UC-id equality
//! 2. handle equality
//! 3. name equality, or name against handle body in either direction
//! 4. custom URL equality
//! 5. a bridge through the learned `ChannelMap` (id ↔ handle / custom URL)
//!
//! `ChannelIndex` is the compiled set form of a whole filter list.

use std::collections::{HashMap, HashSet};

use crate::identity::{
    canonicalize_channel_input, normalize_custom_url, normalize_handle_for_comparison,
    normalize_uc_id, ChannelInputKind,
};
use crate::normalize::normalize_for_comparison;
use crate::types::{ChannelFilter, ChannelIdentity};

// =============================================================================
// Comparison Keys
// =============================================================================

/// Normalized key for any channel reference, in whichever identifier space
/// it belongs to. Empty when nothing usable remains.
pub fn comparison_key(raw: &str) -> String {
    let canonical = canonicalize_channel_input(raw);
    let key = match canonical.kind {
        ChannelInputKind::UcId => canonical.value.to_ascii_lowercase(),
        ChannelInputKind::Handle => normalize_handle_for_comparison(&canonical.value),
        ChannelInputKind::CustomUrl => normalize_custom_url(&canonical.value),
        ChannelInputKind::Unknown => String::new(),
    };

    if key.is_empty() {
        normalize_for_comparison(raw)
    } else {
        key
    }
}

// =============================================================================
// Channel Map
// =============================================================================

/// Learned id ↔ handle / custom URL aliases.
///
/// Keys and values are stored in comparison form, so lookups with keys
/// produced by `ChannelKey` are plain hash hits. A reverse table answers
/// "which keys map to this value" without scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMap {
    forward: HashMap<String, String>,
    reverse: HashMap<String, Vec<String>>,
}

impl ChannelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an alias. Entries that normalize to nothing are ignored.
    pub fn insert(&mut self, key: &str, value: &str) {
        let key = comparison_key(key);
        let value = comparison_key(value);
        if key.is_empty() || value.is_empty() || key == value {
            return;
        }

        if let Some(previous) = self.forward.insert(key.clone(), value.clone()) {
            if let Some(keys) = self.reverse.get_mut(&previous) {
                keys.retain(|k| *k != key);
            }
        }

        let keys = self.reverse.entry(value).or_default();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    /// Counterpart of a raw reference.
    pub fn get(&self, raw: &str) -> Option<&str> {
        self.forward.get(&comparison_key(raw)).map(String::as_str)
    }

    #[inline]
    fn lookup(&self, key: &str) -> Option<&str> {
        self.forward.get(key).map(String::as_str)
    }

    #[inline]
    fn keys_for(&self, value: &str) -> &[String] {
        self.reverse.get(value).map_or(&[], Vec::as_slice)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for ChannelMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key.as_ref(), value.as_ref());
        }
        map
    }
}

// =============================================================================
// Channel Key
// =============================================================================

/// One channel in comparison form. Empty strings mean "absent".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelKey {
    pub id: String,
    pub handles: Vec<String>,
    pub custom_url: String,
    pub name: String,
}

impl ChannelKey {
    fn push_handle(&mut self, raw: &str) {
        let handle = normalize_handle_for_comparison(raw);
        if !handle.is_empty() && !self.handles.contains(&handle) {
            self.handles.push(handle);
        }
    }

    fn set_name(&mut self, raw: &str) {
        self.name = normalize_for_comparison(raw);
        if raw.trim_start().starts_with('@') {
            self.push_handle(raw);
        }
    }

    pub fn from_filter(filter: &ChannelFilter) -> Self {
        let mut key = Self {
            id: filter.id.as_deref().map(normalize_uc_id).unwrap_or_default(),
            custom_url: filter
                .custom_url
                .as_deref()
                .map(normalize_custom_url)
                .unwrap_or_default(),
            ..Self::default()
        };

        for handle in [&filter.handle, &filter.canonical_handle, &filter.handle_display]
            .into_iter()
            .flatten()
        {
            key.push_handle(handle);
        }
        if let Some(name) = filter.name.as_deref() {
            key.set_name(name);
        }

        // Entries saved before enrichment may only carry what the user typed
        if key.is_empty() {
            if let Some(legacy) = filter.original_input.as_deref().and_then(ChannelFilter::from_legacy) {
                return Self::from_filter(&ChannelFilter {
                    original_input: None,
                    ..legacy
                });
            }
        }

        key
    }

    pub fn from_identity(identity: &ChannelIdentity) -> Self {
        let mut key = Self {
            id: identity.id.as_deref().map(normalize_uc_id).unwrap_or_default(),
            custom_url: identity
                .custom_url
                .as_deref()
                .map(normalize_custom_url)
                .unwrap_or_default(),
            ..Self::default()
        };
        if let Some(handle) = identity.handle.as_deref() {
            key.push_handle(handle);
        }
        if let Some(name) = identity.name.as_deref() {
            key.set_name(name);
        }
        key
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.handles.is_empty() && self.custom_url.is_empty() && self.name.is_empty()
    }

    /// Handles without the leading `@`.
    fn handle_bodies(&self) -> impl Iterator<Item = &str> {
        self.handles.iter().map(|h| &h[1..])
    }

    /// Non-id keys that can appear on either side of a map entry.
    fn alias_keys(&self) -> impl Iterator<Item = &str> {
        self.handles
            .iter()
            .map(String::as_str)
            .chain((!self.custom_url.is_empty()).then_some(self.custom_url.as_str()))
    }

    fn has_alias(&self, key: &str) -> bool {
        self.alias_keys().any(|alias| alias == key)
    }
}

// =============================================================================
// Pairwise Matching
// =============================================================================

/// Which rung of the ladder produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStep {
    Id,
    Handle,
    Name,
    CustomUrl,
    Bridge,
}

impl MatchStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Handle => "handle",
            Self::Name => "name",
            Self::CustomUrl => "customUrl",
            Self::Bridge => "bridge",
        }
    }
}

fn bridge_matches(observed: &ChannelKey, filter: &ChannelKey, map: &ChannelMap) -> bool {
    if map.is_empty() {
        return false;
    }

    let id_maps_to = |id: &str, other: &ChannelKey| {
        !id.is_empty() && map.lookup(id).is_some_and(|alias| other.has_alias(alias))
    };
    let alias_maps_to = |side: &ChannelKey, id: &str| {
        !id.is_empty() && side.alias_keys().any(|alias| map.lookup(alias) == Some(id))
    };

    id_maps_to(filter.id.as_str(), observed)
        || id_maps_to(observed.id.as_str(), filter)
        || alias_maps_to(filter, observed.id.as_str())
        || alias_maps_to(observed, filter.id.as_str())
}

fn match_keys(observed: &ChannelKey, filter: &ChannelKey, map: &ChannelMap) -> Option<MatchStep> {
    if !filter.id.is_empty() && filter.id == observed.id {
        return Some(MatchStep::Id);
    }

    if observed.handles.iter().any(|h| filter.handles.contains(h)) {
        return Some(MatchStep::Handle);
    }

    let name_matches = (!observed.name.is_empty() && observed.name == filter.name)
        || (!observed.name.is_empty() && filter.handle_bodies().any(|body| body == observed.name))
        || (!filter.name.is_empty() && observed.handle_bodies().any(|body| body == filter.name));
    if name_matches {
        return Some(MatchStep::Name);
    }

    if !filter.custom_url.is_empty() && filter.custom_url == observed.custom_url {
        return Some(MatchStep::CustomUrl);
    }

    bridge_matches(observed, filter, map).then_some(MatchStep::Bridge)
}

/// Does the observed identity match one filter entry?
///
/// Entries with no identifying field never match.
pub fn channel_matches_filter(identity: &ChannelIdentity, filter: &ChannelFilter, map: &ChannelMap) -> bool {
    let filter = ChannelKey::from_filter(filter);
    if filter.is_empty() {
        return false;
    }
    let observed = ChannelKey::from_identity(identity);
    if observed.is_empty() {
        return false;
    }
    match_keys(&observed, &filter, map).is_some()
}

// =============================================================================
// Channel Index
// =============================================================================

/// Deterministic, order-insensitive signature of a channel list.
pub fn channel_list_signature(filters: &[ChannelFilter]) -> String {
    fn part(field: &Option<String>) -> String {
        field.as_deref().map(|v| v.trim().to_lowercase()).unwrap_or_default()
    }

    let mut parts: Vec<String> = filters
        .iter()
        .map(|f| {
            [
                part(&f.id),
                part(&f.handle),
                part(&f.canonical_handle),
                part(&f.handle_display),
                part(&f.custom_url),
                part(&f.name),
                part(&f.original_input),
            ]
            .join("|")
        })
        .collect();
    parts.sort_unstable();
    parts.join("\n")
}

/// A channel filter list compiled into hash sets.
#[derive(Debug, Clone, Default)]
pub struct ChannelIndex {
    ids: HashSet<String>,
    handles: HashSet<String>,
    custom_urls: HashSet<String>,
    names: HashSet<String>,
    handle_bodies: HashSet<String>,
    entries: usize,
    unresolved_handle_keys: Vec<String>,
    source_signature: String,
}

impl ChannelIndex {
    pub fn build(filters: &[ChannelFilter]) -> Self {
        let mut index = Self {
            source_signature: channel_list_signature(filters),
            ..Self::default()
        };

        for filter in filters {
            let key = ChannelKey::from_filter(filter);
            if key.is_empty() {
                log::debug!("Channel entry without identity ignored: {:?}", filter.original_input);
                continue;
            }
            index.entries += 1;

            if !key.id.is_empty() {
                index.ids.insert(key.id.clone());
            } else if let Some(first) = key.handles.first() {
                if !index.unresolved_handle_keys.contains(first) {
                    index.unresolved_handle_keys.push(first.clone());
                }
            }
            for handle in &key.handles {
                index.handle_bodies.insert(handle[1..].to_string());
                index.handles.insert(handle.clone());
            }
            if !key.custom_url.is_empty() {
                index.custom_urls.insert(key.custom_url);
            }
            if !key.name.is_empty() {
                index.names.insert(key.name);
            }
        }

        index
    }

    /// Number of entries that carried at least one identifying field.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    #[inline]
    pub fn signature(&self) -> &str {
        &self.source_signature
    }

    /// Handles of entries that have no UC-id yet, for the enrichment collaborator.
    #[inline]
    pub fn unresolved_handle_keys(&self) -> &[String] {
        &self.unresolved_handle_keys
    }

    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    pub fn handles(&self) -> &HashSet<String> {
        &self.handles
    }

    pub fn custom_urls(&self) -> &HashSet<String> {
        &self.custom_urls
    }

    pub fn names(&self) -> &HashSet<String> {
        &self.names
    }

    fn bridge(&self, observed: &ChannelKey, map: &ChannelMap) -> bool {
        if map.is_empty() {
            return false;
        }

        if !observed.id.is_empty() {
            // Observed id is learned to be one of the blocked handles / URLs
            if let Some(alias) = map.lookup(&observed.id) {
                if self.handles.contains(alias) || self.custom_urls.contains(alias) {
                    return true;
                }
            }
            // A blocked handle / URL is learned to be the observed id
            if map
                .keys_for(&observed.id)
                .iter()
                .any(|key| self.handles.contains(key) || self.custom_urls.contains(key))
            {
                return true;
            }
        }

        observed.alias_keys().any(|alias| {
            map.lookup(alias).is_some_and(|id| self.ids.contains(id))
                || map.keys_for(alias).iter().any(|id| self.ids.contains(id))
        })
    }

    fn match_key(&self, observed: &ChannelKey, map: &ChannelMap) -> Option<MatchStep> {
        if !observed.id.is_empty() && self.ids.contains(&observed.id) {
            return Some(MatchStep::Id);
        }

        if observed.handles.iter().any(|h| self.handles.contains(h)) {
            return Some(MatchStep::Handle);
        }

        let name_matches = (!observed.name.is_empty()
            && (self.names.contains(&observed.name) || self.handle_bodies.contains(&observed.name)))
            || observed.handle_bodies().any(|body| self.names.contains(body));
        if name_matches {
            return Some(MatchStep::Name);
        }

        if !observed.custom_url.is_empty() && self.custom_urls.contains(&observed.custom_url) {
            return Some(MatchStep::CustomUrl);
        }

        self.bridge(observed, map).then_some(MatchStep::Bridge)
    }

    /// Match one observed identity against the whole list.
    pub fn matches(&self, identity: &ChannelIdentity, map: &ChannelMap) -> Option<MatchStep> {
        if self.is_empty() {
            return None;
        }
        let observed = ChannelKey::from_identity(identity);
        if observed.is_empty() {
            return None;
        }
        self.match_key(&observed, map)
    }

    /// First match among several identities (collaborator bylines).
    pub fn matches_any(&self, identities: &[ChannelIdentity], map: &ChannelMap) -> Option<MatchStep> {
        identities.iter().find_map(|identity| self.matches(identity, map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "UCabcdefghijklmnopqrstuv";
    const OTHER_ID: &str = "UCzyxwvutsrqponmlkjihgfe";

    fn full_filter() -> ChannelFilter {
        ChannelFilter {
            id: Some(ID.to_string()),
            handle: Some("@foo".to_string()),
            custom_url: Some("c/Foo".to_string()),
            name: Some("Foo".to_string()),
            ..ChannelFilter::default()
        }
    }

    fn identity(id: Option<&str>, handle: Option<&str>, custom_url: Option<&str>, name: Option<&str>) -> ChannelIdentity {
        ChannelIdentity {
            id: id.map(str::to_string),
            handle: handle.map(str::to_string),
            custom_url: custom_url.map(str::to_string),
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_alias_closure() {
        let filter = full_filter();
        let map = ChannelMap::new();
        let index = ChannelIndex::build(&[filter.clone()]);

        let observed = [
            identity(Some(ID), None, None, None),
            identity(None, Some("@foo"), None, None),
            identity(None, Some("@FOO"), None, None),
            identity(None, None, None, Some("foo")),
            identity(None, None, Some("c/foo"), None),
        ];
        for o in &observed {
            assert!(channel_matches_filter(o, &filter, &map), "{o:?}");
            assert!(index.matches(o, &map).is_some(), "{o:?}");
        }
    }

    #[test]
    fn test_match_steps() {
        let index = ChannelIndex::build(&[full_filter()]);
        let map = ChannelMap::new();
        assert_eq!(index.matches(&identity(Some(ID), None, None, None), &map), Some(MatchStep::Id));
        assert_eq!(index.matches(&identity(None, Some("@Foo"), None, None), &map), Some(MatchStep::Handle));
        assert_eq!(index.matches(&identity(None, None, None, Some("FOO")), &map), Some(MatchStep::Name));
        assert_eq!(
            index.matches(&identity(None, None, Some("https://youtube.com/c/Foo"), None), &map),
            Some(MatchStep::CustomUrl)
        );
    }

    #[test]
    fn test_name_against_handle_body() {
        let map = ChannelMap::new();
        let by_handle = ChannelFilter::from_legacy("@BadChannel").unwrap();
        assert!(channel_matches_filter(&identity(None, None, None, Some("BadChannel")), &by_handle, &map));

        let by_name = ChannelFilter::from_legacy("BadChannel").unwrap();
        assert!(channel_matches_filter(&identity(None, Some("@badchannel"), None, None), &by_name, &map));

        let other = ChannelFilter::from_legacy("@OtherChannel").unwrap();
        assert!(!channel_matches_filter(&identity(None, None, None, Some("BadChannel")), &other, &map));
    }

    #[test]
    fn test_unrelated_ids_do_not_match() {
        let map = ChannelMap::new();
        let filter = ChannelFilter {
            id: Some(ID.to_string()),
            ..ChannelFilter::default()
        };
        assert!(!channel_matches_filter(&identity(Some(OTHER_ID), None, None, Some("Foo")), &filter, &map));
    }

    #[test]
    fn test_curly_apostrophe_handles_match() {
        let map = ChannelMap::new();
        let filter = ChannelFilter::from_legacy("@it's").unwrap();
        assert!(channel_matches_filter(&identity(None, Some("@it\u{2019}s"), None, None), &filter, &map));
    }

    #[test]
    fn test_empty_filter_never_matches() {
        let map = ChannelMap::new();
        let empty = ChannelFilter {
            filter_all: true,
            ..ChannelFilter::default()
        };
        assert!(!channel_matches_filter(&identity(Some(ID), Some("@foo"), None, Some("Foo")), &empty, &map));

        let index = ChannelIndex::build(&[empty]);
        assert!(index.is_empty());
        assert_eq!(index.matches(&identity(Some(ID), None, None, None), &map), None);
    }

    #[test]
    fn test_empty_identity_never_matches() {
        let map = ChannelMap::new();
        assert!(!channel_matches_filter(&ChannelIdentity::default(), &full_filter(), &map));
    }

    #[test]
    fn test_bridge_filter_id_to_observed_handle() {
        let filter = ChannelFilter {
            id: Some(ID.to_string()),
            ..ChannelFilter::default()
        };
        let map: ChannelMap = [(ID, "@Foo")].into_iter().collect();
        let observed = identity(None, Some("@foo"), None, None);
        assert!(channel_matches_filter(&observed, &filter, &map));
        let index = ChannelIndex::build(&[filter]);
        assert_eq!(index.matches(&observed, &map), Some(MatchStep::Bridge));
    }

    #[test]
    fn test_bridge_filter_handle_to_observed_id() {
        let filter = ChannelFilter::from_legacy("@foo").unwrap();
        let map: ChannelMap = [("@foo", ID)].into_iter().collect();
        let observed = identity(Some(ID), None, None, Some("Unrelated Title"));
        assert!(channel_matches_filter(&observed, &filter, &map));
        let index = ChannelIndex::build(&[filter]);
        assert_eq!(index.matches(&observed, &map), Some(MatchStep::Bridge));
    }

    #[test]
    fn test_bridge_reverse_entries() {
        let observed_id = identity(Some(ID), None, None, None);
        let observed_handle = identity(None, Some("@foo"), None, None);

        // Map written only in the handle → id direction
        let map: ChannelMap = [("@foo", ID)].into_iter().collect();
        let by_id = ChannelIndex::build(&[ChannelFilter {
            id: Some(ID.to_string()),
            ..ChannelFilter::default()
        }]);
        assert_eq!(by_id.matches(&observed_handle, &map), Some(MatchStep::Bridge));

        // Map written only in the id → custom URL direction
        let map: ChannelMap = [(ID, "youtube.com/c/Foo")].into_iter().collect();
        let by_url = ChannelIndex::build(&[ChannelFilter::from_legacy("c/Foo").unwrap()]);
        assert_eq!(by_url.matches(&observed_id, &map), Some(MatchStep::Bridge));
    }

    #[test]
    fn test_bridge_miss_is_not_a_match() {
        let map: ChannelMap = [(OTHER_ID, "@someone")].into_iter().collect();
        let filter = ChannelFilter {
            id: Some(ID.to_string()),
            ..ChannelFilter::default()
        };
        assert!(!channel_matches_filter(&identity(None, Some("@foo"), None, None), &filter, &map));
    }

    #[test]
    fn test_channel_map_normalizes_keys() {
        let mut map = ChannelMap::new();
        map.insert("UCABCDEFGHIJKLMNOPQRSTUV", "@Foo");
        assert_eq!(map.get("ucabcdefghijklmnopqrstuv"), Some("@foo"));
        map.insert("ucabcdefghijklmnopqrstuv", "@Bar");
        assert_eq!(map.get(ID), Some("@bar"));
        assert_eq!(map.len(), 1);
        assert!(map.keys_for("@foo").is_empty());
        map.insert("", "@x");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_legacy_original_input_only() {
        let filter = ChannelFilter {
            original_input: Some("https://www.youtube.com/@Legacy".to_string()),
            ..ChannelFilter::default()
        };
        let map = ChannelMap::new();
        assert!(channel_matches_filter(&identity(None, Some("@legacy"), None, None), &filter, &map));
    }

    #[test]
    fn test_index_signature_and_unresolved() {
        let a = vec![ChannelFilter::from_legacy("@foo").unwrap(), full_filter()];
        let b = vec![full_filter(), ChannelFilter::from_legacy("@foo").unwrap()];
        let index = ChannelIndex::build(&a);
        assert_eq!(index.signature(), ChannelIndex::build(&b).signature());
        assert_eq!(index.len(), 2);
        assert_eq!(index.unresolved_handle_keys(), ["@foo".to_string()]);
        assert!(index.ids().contains("ucabcdefghijklmnopqrstuv"));
        assert!(index.custom_urls().contains("c/foo"));
        assert!(index.names().contains("foo"));
        assert!(index.handles().contains("@foo"));
    }

    #[test]
    fn test_matches_any_collaborators() {
        let index = ChannelIndex::build(&[ChannelFilter::from_legacy("@second").unwrap()]);
        let map = ChannelMap::new();
        let byline = [
            identity(None, Some("@first"), None, Some("First")),
            identity(None, Some("@second"), None, Some("Second")),
        ];
        assert_eq!(index.matches_any(&byline, &map), Some(MatchStep::Handle));
        assert_eq!(index.matches_any(&byline[..1], &map), None);
    }
}
