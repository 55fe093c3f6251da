//! Recursive Tree Filter
//!
//! Walks an arbitrary JSON payload depth-first and returns a pruned copy.
//! The input is never modified, so a pristine snapshot can be re-filtered
//! whenever settings change.
//!
//! An object is removed as a whole when any of its registered shape keys
//! evaluates to a block. Otherwise every property is filtered recursively and
//! properties whose value was removed are dropped.

use std::borrow::Cow;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::channel::{ChannelIndex, ChannelMap};
use crate::keyword::CompiledKeywords;
use crate::rules::{extract_fields, NodeShape, RuleEntry, ShapeKind};
use crate::types::{BlockReason, ChannelIdentity, FilterFlags, ReasonCounts};

// =============================================================================
// Filter State
// =============================================================================

/// Compiled, immutable filter configuration.
///
/// Compiled parts are shared behind `Arc` so that cached structures can be
/// handed out without copying.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    pub keywords: Arc<CompiledKeywords>,
    pub channels: Arc<ChannelIndex>,
    pub channel_map: Arc<ChannelMap>,
    pub flags: FilterFlags,
}

impl FilterState {
    /// Filter a payload.
    pub fn filter(&self, root: &Value) -> FilterOutcome {
        TreeFilter::new(self).filter(root)
    }

    /// True when no node can ever be removed.
    pub fn is_noop(&self) -> bool {
        !self
            .flags
            .intersects(FilterFlags::HIDE_ALL_SHORTS | FilterFlags::HIDE_ALL_COMMENTS)
            && self.keywords.is_empty()
            && self.channels.is_empty()
    }

    /// Channel decision for a single identity (DOM fallback, block menu).
    pub fn is_channel_blocked(&self, identity: &ChannelIdentity) -> bool {
        self.channels.matches(identity, &self.channel_map).is_some()
    }

    /// Keyword decision for a title or description text.
    pub fn text_matches(&self, text: &str) -> bool {
        self.keywords.matches(text)
    }

    /// Keyword decision for comment text; only comment-scoped keywords apply.
    pub fn comment_text_matches(&self, text: &str) -> bool {
        self.keywords.first_comment_match(text).is_some()
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Result of one filter pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Filtered tree; `None` when the root itself was removed
    pub value: Option<Value>,
    pub removed: usize,
    pub reasons: ReasonCounts,
}

impl FilterOutcome {
    /// Filtered tree, with a removed root represented as `null`.
    pub fn into_value(self) -> Value {
        self.value.unwrap_or(Value::Null)
    }
}

// =============================================================================
// Tree Filter
// =============================================================================

/// One filter pass over one tree.
pub struct TreeFilter<'a> {
    state: &'a FilterState,
    removed: usize,
    reasons: ReasonCounts,
}

impl<'a> TreeFilter<'a> {
    pub fn new(state: &'a FilterState) -> Self {
        Self {
            state,
            removed: 0,
            reasons: ReasonCounts::default(),
        }
    }

    pub fn filter(mut self, root: &Value) -> FilterOutcome {
        let value = if self.state.is_noop() {
            Some(root.clone())
        } else {
            self.visit(root)
        };

        FilterOutcome {
            value,
            removed: self.removed,
            reasons: self.reasons,
        }
    }

    fn visit(&mut self, value: &Value) -> Option<Value> {
        match value {
            Value::Object(map) => self.visit_object(map),
            Value::Array(items) => Some(Value::Array(
                items.iter().filter_map(|item| self.visit(item)).collect(),
            )),
            scalar => Some(scalar.clone()),
        }
    }

    fn visit_object(&mut self, map: &Map<String, Value>) -> Option<Value> {
        for (key, body) in map {
            let Some(shape) = NodeShape::from_key(key) else {
                continue;
            };
            let Some(rule) = shape.rule() else {
                log::trace!("Unknown shape {key}, passing through");
                continue;
            };

            if let Some(reason) = self.evaluate(rule, body) {
                self.removed += 1;
                self.reasons.record(reason);
                log::debug!(
                    "Removed {} ({}){}",
                    rule.tag,
                    reason.as_str(),
                    body.get("videoId")
                        .and_then(Value::as_str)
                        .map(|id| format!(" video {id}"))
                        .unwrap_or_default()
                );
                return None;
            }
        }

        let mut out = Map::with_capacity(map.len());
        for (key, child) in map {
            if let Some(filtered) = self.visit(child) {
                out.insert(key.clone(), filtered);
            }
        }

        if self.collapses(map, &out) {
            return None;
        }

        Some(Value::Object(out))
    }

    /// Wrapper shapes disappear once the single item they wrap was removed.
    fn collapses(&self, input: &Map<String, Value>, output: &Map<String, Value>) -> bool {
        input.iter().any(|(key, body)| {
            let Some(child_key) = NodeShape::from_key(key).and_then(NodeShape::rule).and_then(|r| r.wraps) else {
                return false;
            };
            let Some(child) = body.get(child_key) else {
                return false;
            };

            let collapsed = match output.get(key).and_then(|b| b.get(child_key)) {
                None => true,
                Some(Value::Array(items)) => items.is_empty() && child.as_array().is_some_and(|a| !a.is_empty()),
                Some(_) => false,
            };
            if collapsed {
                log::debug!("Collapsed empty {key}");
            }
            collapsed
        })
    }

    /// Block decision for one shape body, in fixed precedence: shorts,
    /// channel, keyword, then comment rules.
    pub fn evaluate(&self, rule: &RuleEntry, body: &Value) -> Option<BlockReason> {
        let state = self.state;
        let flags = state.flags;

        match rule.kind {
            ShapeKind::Container => return None,
            ShapeKind::Short if flags.contains(FilterFlags::HIDE_ALL_SHORTS) => {
                return Some(BlockReason::Shorts)
            }
            _ => {}
        }

        let is_comment = rule.kind == ShapeKind::Comment;
        let wants_comment_rules = is_comment
            && flags.intersects(FilterFlags::HIDE_ALL_COMMENTS | FilterFlags::FILTER_COMMENTS);
        if state.channels.is_empty() && state.keywords.is_empty() && !wants_comment_rules {
            return None;
        }
        let fields = extract_fields(rule, body);

        if !state.channels.is_empty()
            && state
                .channels
                .matches_any(&fields.channels, &state.channel_map)
                .is_some()
        {
            return Some(BlockReason::Channel);
        }

        if !state.keywords.is_empty() {
            let text = match (fields.title.is_empty(), fields.description.is_empty()) {
                (true, true) => None,
                (false, true) => Some(Cow::Borrowed(fields.title.as_str())),
                (true, false) => Some(Cow::Borrowed(fields.description.as_str())),
                (false, false) => Some(Cow::Owned(format!("{} {}", fields.title, fields.description))),
            };
            if text.is_some_and(|text| state.keywords.first_match(&text).is_some()) {
                return Some(BlockReason::Keyword);
            }
        }

        if is_comment {
            return self.evaluate_comment(&fields.comment_text);
        }

        None
    }

    /// Comment rules. The author was already checked against the channel
    /// list, so only the flags and comment-scoped keywords remain.
    fn evaluate_comment(&self, comment_text: &str) -> Option<BlockReason> {
        let state = self.state;
        if state.flags.contains(FilterFlags::HIDE_ALL_COMMENTS) {
            return Some(BlockReason::AllComments);
        }
        if !state.flags.contains(FilterFlags::FILTER_COMMENTS) || comment_text.is_empty() {
            return None;
        }

        state
            .keywords
            .first_comment_match(comment_text)
            .map(|_| BlockReason::CommentKeyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelFilter, KeywordFilter};
    use serde_json::json;

    fn state(keywords: &[KeywordFilter], channels: &[ChannelFilter], flags: FilterFlags) -> FilterState {
        FilterState {
            keywords: Arc::new(CompiledKeywords::compile(keywords)),
            channels: Arc::new(ChannelIndex::build(channels)),
            channel_map: Arc::new(ChannelMap::new()),
            flags,
        }
    }

    fn video(id: &str, title: &str, channel: &str) -> Value {
        json!({"videoRenderer": {
            "videoId": id,
            "title": {"runs": [{"text": title}]},
            "shortBylineText": {"runs": [{"text": channel}]}
        }})
    }

    #[test]
    fn test_scalars_and_noop() {
        let st = FilterState::default();
        assert!(st.is_noop());
        let input = json!({"a": [1, "two", null, {"videoRenderer": {"title": "x"}}]});
        let outcome = st.filter(&input);
        assert_eq!(outcome.value.as_ref(), Some(&input));
        assert_eq!(outcome.removed, 0);
        assert_eq!(state(&[], &[], FilterFlags::empty()).filter(&json!(42)).into_value(), json!(42));
    }

    #[test]
    fn test_keyword_removes_whole_object() {
        let st = state(&[KeywordFilter::new("spoiler", false)], &[], FilterFlags::empty());
        let input = json!({"contents": [
            video("a", "Big spoiler ahead", "Someone"),
            video("b", "Harmless", "Someone"),
        ]});
        let outcome = st.filter(&input);
        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.reasons.get(BlockReason::Keyword), 1);
        assert_eq!(outcome.into_value(), json!({"contents": [video("b", "Harmless", "Someone")]}));
    }

    #[test]
    fn test_description_is_checked() {
        let st = state(&[KeywordFilter::new("sponsored", true)], &[], FilterFlags::empty());
        let input = json!([{"videoRenderer": {
            "title": {"simpleText": "Review"},
            "descriptionSnippet": {"runs": [{"text": "This is sponsored content"}]}
        }}]);
        assert_eq!(st.filter(&input).into_value(), json!([]));
    }

    #[test]
    fn test_channel_takes_precedence_over_keyword() {
        let st = state(
            &[KeywordFilter::new("bread", false)],
            &[ChannelFilter::from_legacy("Baker").unwrap()],
            FilterFlags::empty(),
        );
        let outcome = st.filter(&json!([video("a", "bread", "Baker")]));
        assert_eq!(outcome.reasons.get(BlockReason::Channel), 1);
        assert_eq!(outcome.reasons.get(BlockReason::Keyword), 0);
    }

    #[test]
    fn test_shorts_flag() {
        let st = state(&[], &[], FilterFlags::HIDE_ALL_SHORTS);
        let input = json!({"items": [
            {"shortsLockupViewModel": {"entityId": "s1"}},
            video("v", "Regular", "Someone"),
        ]});
        let outcome = st.filter(&input);
        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.reasons.get(BlockReason::Shorts), 1);
        assert_eq!(outcome.into_value(), json!({"items": [video("v", "Regular", "Someone")]}));
    }

    #[test]
    fn test_unknown_shape_passes_through_but_children_are_filtered() {
        let st = state(&[KeywordFilter::new("bad", true)], &[], FilterFlags::empty());
        let input = json!({"brandNewShelfRenderer": {
            "title": {"simpleText": "bad shelf title"},
            "contents": [video("a", "bad video", "x"), video("b", "good video", "x")]
        }});
        let outcome = st.filter(&input);
        assert_eq!(outcome.removed, 1);
        assert_eq!(
            outcome.into_value(),
            json!({"brandNewShelfRenderer": {
                "title": {"simpleText": "bad shelf title"},
                "contents": [video("b", "good video", "x")]
            }})
        );
    }

    #[test]
    fn test_rich_item_collapses_without_counting() {
        let st = state(&[KeywordFilter::new("drama", false)], &[], FilterFlags::empty());
        let input = json!({"contents": [
            {"richItemRenderer": {"content": video("a", "Drama time", "x"), "trackingParams": "t"}},
            {"richItemRenderer": {"content": video("b", "Calm", "x")}},
            {"richItemRenderer": {"trackingParams": "no content"}},
        ]});
        let outcome = st.filter(&input);
        assert_eq!(outcome.removed, 1);
        assert_eq!(
            outcome.into_value(),
            json!({"contents": [
                {"richItemRenderer": {"content": video("b", "Calm", "x")}},
                {"richItemRenderer": {"trackingParams": "no content"}},
            ]})
        );
    }

    #[test]
    fn test_reel_shelf_collapses_when_emptied() {
        let st = state(&[KeywordFilter::new("prank", false)], &[], FilterFlags::empty());
        let input = json!({"contents": [
            {"reelShelfRenderer": {"items": [
                {"reelItemRenderer": {"videoId": "r1", "headline": {"simpleText": "prank 1"}}},
                {"reelItemRenderer": {"videoId": "r2", "headline": {"simpleText": "prank 2"}}},
            ]}},
            {"reelShelfRenderer": {"items": []}},
        ]});
        let outcome = st.filter(&input);
        assert_eq!(outcome.removed, 2);
        assert_eq!(outcome.into_value(), json!({"contents": [{"reelShelfRenderer": {"items": []}}]}));
    }

    #[test]
    fn test_comment_rules() {
        let thread = json!({"commentThreadRenderer": {"comment": {"commentRenderer": {
            "contentText": {"runs": [{"text": "total scam link"}]},
            "authorText": {"simpleText": "@spammer"}
        }}}});

        let off = state(&[KeywordFilter::new("scam", false)], &[], FilterFlags::empty());
        assert_eq!(off.filter(&json!([thread.clone()])).removed, 0);

        let on = state(&[KeywordFilter::new("scam", false)], &[], FilterFlags::FILTER_COMMENTS);
        let outcome = on.filter(&json!([thread.clone()]));
        assert_eq!(outcome.reasons.get(BlockReason::CommentKeyword), 1);

        let by_author = state(&[], &[ChannelFilter::from_legacy("@spammer").unwrap()], FilterFlags::FILTER_COMMENTS);
        let outcome = by_author.filter(&json!([thread.clone()]));
        assert_eq!(outcome.reasons.get(BlockReason::Channel), 1);

        let mut title_only = KeywordFilter::new("scam", false);
        title_only.comments = false;
        let scoped = state(&[title_only], &[], FilterFlags::FILTER_COMMENTS);
        assert_eq!(scoped.filter(&json!([thread])).removed, 0);
    }

    #[test]
    fn test_hide_all_comments_removes_thread_once() {
        let st = state(&[], &[], FilterFlags::HIDE_ALL_COMMENTS);
        let input = json!({"contents": [{"commentThreadRenderer": {
            "comment": {"commentRenderer": {"contentText": {"simpleText": "hi"}}}
        }}]});
        let outcome = st.filter(&input);
        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.reasons.get(BlockReason::AllComments), 1);
        assert_eq!(outcome.into_value(), json!({"contents": []}));
    }

    #[test]
    fn test_root_removal() {
        let st = state(&[KeywordFilter::new("gone", false)], &[], FilterFlags::empty());
        let outcome = st.filter(&video("a", "gone", "x"));
        assert_eq!(outcome.value, None);
        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.into_value(), Value::Null);
    }

    #[test]
    fn test_single_identity_decisions() {
        let st = state(
            &[KeywordFilter::new("cat", true)],
            &[ChannelFilter::from_legacy("@foo").unwrap()],
            FilterFlags::empty(),
        );
        assert!(st.is_channel_blocked(&ChannelIdentity {
            name: Some("Foo".to_string()),
            ..ChannelIdentity::default()
        }));
        assert!(!st.is_channel_blocked(&ChannelIdentity::default()));
        assert!(st.text_matches("my cat"));
        assert!(st.comment_text_matches("my cat"));
        assert!(!st.text_matches("category"));
    }
}
