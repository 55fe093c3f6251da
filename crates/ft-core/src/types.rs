//! Core type definitions for FilterTube
//!
//! These types mirror the persisted settings entries and are shared by the
//! match engines, the tree filter and the settings compiler.

use serde::{Deserialize, Serialize};

use crate::identity::{
    canonicalize_channel_input, normalize_custom_url, normalize_handle_for_comparison,
    normalize_uc_id, ChannelInputKind,
};
use crate::normalize::normalize_for_comparison;

// =============================================================================
// Feature Flags
// =============================================================================

bitflags::bitflags! {
    /// Boolean feature switches from the settings object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FilterFlags: u8 {
        /// Remove every shorts-shaped node
        const HIDE_ALL_SHORTS = 1 << 0;
        /// Remove every comment-shaped node
        const HIDE_ALL_COMMENTS = 1 << 1;
        /// Apply keyword and channel rules to comments
        const FILTER_COMMENTS = 1 << 2;
        /// Reserved for semantic matching (no effect)
        const SEMANTIC = 1 << 3;
    }
}

impl FilterFlags {
    /// Map a settings key to its flag.
    pub fn from_setting_key(key: &str) -> Option<Self> {
        match key {
            "hideAllShorts" => Some(Self::HIDE_ALL_SHORTS),
            "hideAllComments" => Some(Self::HIDE_ALL_COMMENTS),
            "filterComments" => Some(Self::FILTER_COMMENTS),
            "useSemanticMatching" => Some(Self::SEMANTIC),
            _ => None,
        }
    }
}

// =============================================================================
// Filter Source
// =============================================================================

/// Where a filter entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterSource {
    /// Typed or pasted by the user
    #[default]
    User,
    /// Derived from a channel's "filter all" toggle
    Channel,
    /// Loaded from an import/backup
    Import,
    /// Any value this version does not know
    #[serde(other)]
    Other,
}

// =============================================================================
// Keyword Filter
// =============================================================================

fn default_true() -> bool {
    true
}

/// A keyword rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordFilter {
    /// Keyword text, or a raw regular expression source when `regex_flags` is set
    pub word: String,
    /// Whole-word matching
    #[serde(default)]
    pub exact: bool,
    /// Reserved
    #[serde(default)]
    pub semantic: bool,
    #[serde(default)]
    pub source: FilterSource,
    /// Key of the owning channel for derived keywords
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_ref: Option<String>,
    /// Whether the keyword also applies to comment text
    #[serde(default = "default_true")]
    pub comments: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<f64>,
    /// Flags of an imported `{pattern, flags}` regular expression
    #[serde(default, rename = "flags", skip_serializing_if = "Option::is_none")]
    pub regex_flags: Option<String>,
}

impl KeywordFilter {
    /// Create a user keyword.
    pub fn new(word: impl Into<String>, exact: bool) -> Self {
        Self {
            word: word.into(),
            exact,
            semantic: false,
            source: FilterSource::User,
            channel_ref: None,
            comments: true,
            added_at: None,
            regex_flags: None,
        }
    }

    /// Create a keyword from a serialized regular expression.
    pub fn from_regex(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            regex_flags: Some(flags.into()),
            ..Self::new(pattern, false)
        }
    }

    /// True when `word` holds a raw regular expression source.
    #[inline]
    pub fn is_regex(&self) -> bool {
        self.regex_flags.is_some()
    }

    /// Uniqueness key within a list: lowercase word plus exact flag, or the
    /// literal pattern and flags for a regex entry.
    pub fn dedupe_key(&self) -> String {
        match self.regex_flags.as_deref() {
            Some(flags) => format!("/{}/{}", self.word, flags),
            None => format!("{}|{}", self.word.trim().to_lowercase(), self.exact),
        }
    }
}

// =============================================================================
// Channel Identity
// =============================================================================

/// A channel as observed in content (or as supplied by a collaborator).
///
/// Any subset of fields may be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelIdentity {
    pub id: Option<String>,
    pub handle: Option<String>,
    pub custom_url: Option<String>,
    pub name: Option<String>,
}

impl ChannelIdentity {
    /// True when no field carries a usable value.
    pub fn is_empty(&self) -> bool {
        [&self.id, &self.handle, &self.custom_url, &self.name]
            .iter()
            .all(|field| field.as_deref().map_or(true, |v| v.trim().is_empty()))
    }

    /// Build an identity from a display name, a browse id and a channel URL.
    ///
    /// The URL (`/@handle`, `/channel/UC...`, `/c/Name`, `/user/Name`) fills
    /// whichever identity field it encodes.
    pub fn from_parts(name: Option<String>, id: Option<String>, url: Option<String>) -> Self {
        let mut identity = Self {
            id: id.filter(|v| !normalize_uc_id(v).is_empty()),
            name: name.filter(|v| !v.trim().is_empty()),
            ..Self::default()
        };

        if let Some(url) = url.as_deref() {
            identity.absorb_reference(url);
        }

        // Comment authors are displayed by handle.
        if identity.handle.is_none() {
            if let Some(name) = identity.name.as_deref() {
                if name.trim_start().starts_with('@') {
                    identity.handle = Some(name.trim().to_string());
                }
            }
        }

        identity
    }

    fn absorb_reference(&mut self, reference: &str) {
        let canonical = canonicalize_channel_input(reference);
        match canonical.kind {
            ChannelInputKind::UcId if self.id.is_none() => self.id = Some(canonical.value),
            ChannelInputKind::Handle if self.handle.is_none() => {
                self.handle = Some(canonical.value)
            }
            ChannelInputKind::CustomUrl if self.custom_url.is_none() => {
                self.custom_url = Some(canonical.value)
            }
            _ => {}
        }
    }
}

// =============================================================================
// Channel Filter
// =============================================================================

/// A channel rule.
///
/// Entries are enriched asynchronously, so any identifying field may be
/// missing at any time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub filter_all: bool,
    pub filter_all_comments: bool,
    pub source: FilterSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collaboration_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_collaborators: Option<Vec<ChannelIdentity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<f64>,
}

impl ChannelFilter {
    /// Build a filter from a legacy plain-string entry (`@handle`, `UC...`,
    /// `c/Name`, a channel URL, or a display name).
    pub fn from_legacy(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut filter = Self {
            original_input: Some(trimmed.to_string()),
            ..Self::default()
        };

        let canonical = canonicalize_channel_input(trimmed);
        match canonical.kind {
            ChannelInputKind::UcId => filter.id = Some(canonical.value),
            ChannelInputKind::Handle => filter.handle = Some(canonical.value),
            ChannelInputKind::CustomUrl => filter.custom_url = Some(canonical.value),
            ChannelInputKind::Unknown => filter.name = Some(canonical.value),
        }

        Some(filter)
    }

    /// Canonical key: UC-id when present, then handle, custom URL, name.
    /// Entries that only kept what the user typed are keyed by that input.
    ///
    /// Returns `None` for entries with no identifying field.
    pub fn key(&self) -> Option<String> {
        self.field_key().or_else(|| {
            self.original_input
                .as_deref()
                .and_then(Self::from_legacy)
                .and_then(|legacy| legacy.field_key())
        })
    }

    fn field_key(&self) -> Option<String> {
        let id = self.id.as_deref().map(normalize_uc_id).unwrap_or_default();
        if !id.is_empty() {
            return Some(id);
        }

        for handle in [&self.handle, &self.canonical_handle, &self.handle_display] {
            let normalized = handle
                .as_deref()
                .map(normalize_handle_for_comparison)
                .unwrap_or_default();
            if !normalized.is_empty() {
                return Some(normalized);
            }
        }

        let custom = self
            .custom_url
            .as_deref()
            .map(normalize_custom_url)
            .unwrap_or_default();
        if !custom.is_empty() {
            return Some(custom);
        }

        let name = self
            .name
            .as_deref()
            .map(normalize_for_comparison)
            .unwrap_or_default();
        if !name.is_empty() {
            return Some(name);
        }

        None
    }

    /// Text used for keywords derived from this channel.
    pub fn display_label(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return Some(name.to_string());
        }
        [&self.handle_display, &self.handle, &self.canonical_handle]
            .into_iter()
            .filter_map(|h| h.as_deref())
            .map(|h| h.trim().trim_start_matches('@').to_string())
            .find(|h| !h.is_empty())
    }
}

// =============================================================================
// Block Reasons
// =============================================================================

/// Why a node was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockReason {
    Shorts,
    Channel,
    Keyword,
    AllComments,
    CommentKeyword,
}

impl BlockReason {
    pub const ALL: [BlockReason; 5] = [
        Self::Shorts,
        Self::Channel,
        Self::Keyword,
        Self::AllComments,
        Self::CommentKeyword,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shorts => "shorts",
            Self::Channel => "channel",
            Self::Keyword => "keyword",
            Self::AllComments => "allComments",
            Self::CommentKeyword => "commentKeyword",
        }
    }
}

/// Per-reason removal counters for one filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReasonCounts {
    counts: [usize; BlockReason::ALL.len()],
}

impl ReasonCounts {
    #[inline]
    pub fn record(&mut self, reason: BlockReason) {
        self.counts[reason as usize] += 1;
    }

    #[inline]
    pub fn get(&self, reason: BlockReason) -> usize {
        self.counts[reason as usize]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Non-zero counters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockReason, usize)> + '_ {
        BlockReason::ALL
            .into_iter()
            .map(|reason| (reason, self.get(reason)))
            .filter(|(_, count)| *count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_from_setting_key() {
        assert_eq!(FilterFlags::from_setting_key("hideAllShorts"), Some(FilterFlags::HIDE_ALL_SHORTS));
        assert_eq!(FilterFlags::from_setting_key("filterComments"), Some(FilterFlags::FILTER_COMMENTS));
        assert_eq!(FilterFlags::from_setting_key("somethingElse"), None);
    }

    #[test]
    fn test_keyword_dedupe_key() {
        let a = KeywordFilter::new(" Cat ", true);
        let b = KeywordFilter::new("cat", true);
        let c = KeywordFilter::new("cat", false);
        assert_eq!(a.dedupe_key(), b.dedupe_key());
        assert_ne!(b.dedupe_key(), c.dedupe_key());
    }

    #[test]
    fn test_keyword_deserialize_defaults() {
        let kw: KeywordFilter = serde_json::from_str(r#"{"word":"cat"}"#).unwrap();
        assert!(!kw.exact);
        assert!(kw.comments);
        assert_eq!(kw.source, FilterSource::User);
        assert!(!kw.is_regex());

        let kw: KeywordFilter =
            serde_json::from_str(r#"{"word":"cat","source":"somewhere-new"}"#).unwrap();
        assert_eq!(kw.source, FilterSource::Other);
    }

    #[test]
    fn test_channel_filter_from_legacy() {
        let f = ChannelFilter::from_legacy("@BadChannel").unwrap();
        assert_eq!(f.handle.as_deref(), Some("@BadChannel"));
        assert_eq!(f.key().as_deref(), Some("@badchannel"));

        let f = ChannelFilter::from_legacy("UCabcdefghijklmnopqrstuv").unwrap();
        assert_eq!(f.id.as_deref(), Some("UCabcdefghijklmnopqrstuv"));
        assert_eq!(f.key().as_deref(), Some("ucabcdefghijklmnopqrstuv"));

        let f = ChannelFilter::from_legacy("c/SomeName").unwrap();
        assert_eq!(f.key().as_deref(), Some("c/somename"));

        let f = ChannelFilter::from_legacy("Some Name").unwrap();
        assert_eq!(f.name.as_deref(), Some("Some Name"));

        assert!(ChannelFilter::from_legacy("   ").is_none());
    }

    #[test]
    fn test_channel_filter_without_identity_has_no_key() {
        let f = ChannelFilter {
            filter_all: true,
            ..ChannelFilter::default()
        };
        assert_eq!(f.key(), None);

        let f = ChannelFilter {
            original_input: Some("youtube.com/@Typed".to_string()),
            ..ChannelFilter::default()
        };
        assert_eq!(f.key().as_deref(), Some("@typed"));
    }

    #[test]
    fn test_channel_filter_deserialize_partial() {
        let f: ChannelFilter =
            serde_json::from_str(r#"{"handle":"@foo","filterAll":true,"id":null}"#).unwrap();
        assert_eq!(f.handle.as_deref(), Some("@foo"));
        assert!(f.filter_all);
        assert!(f.id.is_none());
    }

    #[test]
    fn test_identity_from_parts_decodes_url() {
        let identity = ChannelIdentity::from_parts(
            Some("Foo".to_string()),
            None,
            Some("/@foo".to_string()),
        );
        assert_eq!(identity.handle.as_deref(), Some("@foo"));

        let identity = ChannelIdentity::from_parts(
            None,
            None,
            Some("/channel/UCabcdefghijklmnopqrstuv".to_string()),
        );
        assert_eq!(identity.id.as_deref(), Some("UCabcdefghijklmnopqrstuv"));

        let identity = ChannelIdentity::from_parts(Some("@Commenter".to_string()), None, None);
        assert_eq!(identity.handle.as_deref(), Some("@Commenter"));
    }

    #[test]
    fn test_identity_drops_malformed_id() {
        let identity = ChannelIdentity::from_parts(
            Some("Bad".to_string()),
            Some("UC000000000000000000011".to_string()),
            None,
        );
        assert!(identity.id.is_none());
        assert!(!identity.is_empty());
    }

    #[test]
    fn test_reason_counts() {
        let mut counts = ReasonCounts::default();
        counts.record(BlockReason::Keyword);
        counts.record(BlockReason::Keyword);
        counts.record(BlockReason::Shorts);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.get(BlockReason::Keyword), 2);
        let listed: Vec<_> = counts.iter().collect();
        assert_eq!(listed, vec![(BlockReason::Shorts, 1), (BlockReason::Keyword, 2)]);
    }
}
