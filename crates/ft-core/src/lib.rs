//! FilterTube Core Library
//!
//! This crate provides the content filtering and channel identity engine for
//! FilterTube. It walks a video platform's JSON payloads and prunes items that
//! match the user's keyword and channel rules.
//!
//! # Architecture
//!
//! Filtering operates on compiled state (`FilterState`): keyword regexes and a
//! normalized channel index built once per settings change. A filter pass is a
//! pure function over a JSON snapshot: the input is never mutated and the
//! result is a structurally new tree, so a pristine snapshot can be filtered
//! again whenever the settings change.
//!
//! # Modules
//!
//! - `normalize`: Unicode folding used by every comparison
//! - `url`: Channel URL/path helpers without full URL parsing
//! - `identity`: Channel identity canonicalization (UC-id, handle, custom URL)
//! - `path`: Dotted path reader and text flattening over JSON trees
//! - `rules`: Static registry of renderer shapes and their field paths
//! - `keyword`: Keyword compilation and matching
//! - `channel`: Channel matching ladder and compiled channel index
//! - `filter`: Recursive tree filter
//! - `types`: Shared type definitions

pub mod normalize;
pub mod url;
pub mod identity;
pub mod path;
pub mod rules;
pub mod keyword;
pub mod channel;
pub mod filter;
pub mod types;

// Re-export commonly used types
pub use channel::{channel_matches_filter, ChannelIndex, ChannelKey, ChannelMap, MatchStep};
pub use filter::{FilterOutcome, FilterState, TreeFilter};
pub use identity::{canonicalize_channel_input, CanonicalChannel, ChannelInputKind};
pub use keyword::{matches_keyword, CompiledKeyword, CompiledKeywords, PatternError};
pub use rules::{NodeShape, RuleEntry, ShapeKind};
pub use types::{
    BlockReason, ChannelFilter, ChannelIdentity, FilterFlags, FilterSource, KeywordFilter,
    ReasonCounts,
};
