//! Keyword Match Engine
//!
//! Keywords compile to case-insensitive regexes (`\b`-anchored in exact mode).
//! A match is attempted three ways, cheapest first:
//!
//! 1. the compiled regex against the raw text
//! 2. the compiled regex against the text with diacritics and zero-width
//!    code points stripped
//! 3. a folded substring search with manual word-boundary checks, for scripts
//!    where the regex engine's `\b` disagrees with what users expect

use std::borrow::Cow;
use std::cell::OnceCell;

use regex::{Regex, RegexBuilder};

use crate::normalize::{normalize_for_comparison, strip_diacritics};
use crate::types::KeywordFilter;

/// Longest accepted pattern source, in bytes.
pub const MAX_PATTERN_LEN: usize = 1024;

/// Compiled program size limit handed to the regex engine.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

// =============================================================================
// Errors
// =============================================================================

/// Why a pattern could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("empty pattern")]
    Empty,

    #[error("pattern longer than {max} bytes")]
    TooLong { max: usize },

    #[error("unsupported regex flag '{0}'")]
    UnsupportedFlag(char),

    #[error("invalid pattern {pattern:?}: {reason}")]
    Invalid { pattern: String, reason: String },
}

// =============================================================================
// Pattern Compilation
// =============================================================================

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Compile a serialized `{pattern, flags}` pair.
///
/// Accepted flags: `i`, `m`, `s`; `g`, `u`, `y` are accepted and ignored.
pub fn compile_pattern(pattern: &str, flags: &str) -> Result<Regex, PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }
    if pattern.len() > MAX_PATTERN_LEN {
        return Err(PatternError::TooLong { max: MAX_PATTERN_LEN });
    }

    let mut builder = RegexBuilder::new(pattern);
    builder.size_limit(REGEX_SIZE_LIMIT);

    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'g' | 'u' | 'y' => {}
            other => return Err(PatternError::UnsupportedFlag(other)),
        }
    }

    builder.build().map_err(|e| PatternError::Invalid {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Regex source for a plain keyword.
///
/// Exact keywords get `\b` only at ends that are word characters, so
/// `c++` still anchors on the left.
pub fn word_pattern(word: &str, exact: bool) -> String {
    let escaped = regex::escape(word);
    if !exact {
        return escaped;
    }

    let lead = word.chars().next().is_some_and(is_word_char);
    let trail = word.chars().next_back().is_some_and(is_word_char);

    let mut pattern = String::with_capacity(escaped.len() + 4);
    if lead {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&escaped);
    if trail {
        pattern.push_str(r"\b");
    }
    pattern
}

/// Number of backslashes at the end of `s`.
fn trailing_backslashes(s: &str) -> usize {
    s.bytes().rev().take_while(|&b| b == b'\\').count()
}

/// Recover the literal keyword behind a pattern source.
///
/// Strips `\b` anchors (reporting whether any were present) and unescapes
/// punctuation. Returns `None` when the source uses real regex syntax.
pub fn plain_keyword_from_source(source: &str) -> Option<(String, bool)> {
    let mut body = source;
    let mut exact = false;

    if let Some(rest) = body.strip_prefix(r"\b") {
        body = rest;
        exact = true;
    }
    if let Some(rest) = body.strip_suffix(r"\b") {
        if trailing_backslashes(rest) % 2 == 0 {
            body = rest;
            exact = true;
        }
    }

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) if escaped.is_ascii_punctuation() || escaped == ' ' => out.push(escaped),
                _ => return None,
            },
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' => {
                return None
            }
            _ => out.push(c),
        }
    }

    if out.trim().is_empty() {
        None
    } else {
        Some((out, exact))
    }
}

// =============================================================================
// Folded Fallback
// =============================================================================

/// Keyword text in comparison form, used by the third match step.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FoldedKeyword {
    text: String,
    exact: bool,
}

impl FoldedKeyword {
    fn new(word: &str, exact: bool) -> Option<Self> {
        let text = normalize_for_comparison(word);
        (!text.is_empty()).then_some(Self { text, exact })
    }

    fn from_source(source: &str) -> Option<Self> {
        let (word, exact) = plain_keyword_from_source(source)?;
        Self::new(&word, exact)
    }

    /// Substring search over already-folded text.
    fn find_in(&self, folded: &str) -> bool {
        if !self.exact {
            return folded.contains(self.text.as_str());
        }

        folded.match_indices(self.text.as_str()).any(|(start, found)| {
            let before = folded[..start].chars().next_back();
            let after = folded[start + found.len()..].chars().next();
            before.map_or(true, |c| !c.is_alphanumeric()) && after.map_or(true, |c| !c.is_alphanumeric())
        })
    }
}

/// Text with its normalized forms computed on first use.
///
/// Lets a keyword list share the stripping and folding work for one text.
pub struct PreparedText<'t> {
    raw: &'t str,
    stripped: OnceCell<Cow<'t, str>>,
    folded: OnceCell<String>,
}

impl<'t> PreparedText<'t> {
    pub fn new(raw: &'t str) -> Self {
        Self {
            raw,
            stripped: OnceCell::new(),
            folded: OnceCell::new(),
        }
    }

    #[inline]
    pub fn raw(&self) -> &'t str {
        self.raw
    }

    fn stripped(&self) -> &str {
        self.stripped.get_or_init(|| strip_diacritics(self.raw))
    }

    fn folded(&self) -> &str {
        self.folded.get_or_init(|| normalize_for_comparison(self.raw))
    }
}

fn matches_prepared(regex: &Regex, text: &PreparedText<'_>, fallback: Option<&FoldedKeyword>) -> bool {
    if text.raw().is_empty() {
        return false;
    }
    if regex.is_match(text.raw()) {
        return true;
    }

    let stripped = text.stripped();
    if stripped != text.raw() && regex.is_match(stripped) {
        return true;
    }

    fallback.is_some_and(|keyword| keyword.find_in(text.folded()))
}

/// Test one compiled keyword against a text.
///
/// `source` is the pattern source the regex was built from; it supplies the
/// literal keyword for the folded fallback step.
pub fn matches_keyword(regex: &Regex, text: &str, source: &str) -> bool {
    let fallback = FoldedKeyword::from_source(source);
    matches_prepared(regex, &PreparedText::new(text), fallback.as_ref())
}

// =============================================================================
// Compiled Keywords
// =============================================================================

/// One keyword ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledKeyword {
    filter: KeywordFilter,
    source: String,
    regex: Regex,
    fallback: Option<FoldedKeyword>,
}

impl CompiledKeyword {
    /// Compile a keyword entry. Regex entries keep their own flags; plain
    /// entries are escaped and matched case-insensitively.
    pub fn compile(filter: &KeywordFilter) -> Result<Self, PatternError> {
        let (source, regex, fallback) = match filter.regex_flags.as_deref() {
            Some(flags) => {
                let source = filter.word.clone();
                let regex = compile_pattern(&source, flags)?;
                let fallback = FoldedKeyword::from_source(&source);
                (source, regex, fallback)
            }
            None => {
                let word = filter.word.trim();
                if word.is_empty() {
                    return Err(PatternError::Empty);
                }
                let source = word_pattern(word, filter.exact);
                let regex = compile_pattern(&source, "i")?;
                (source, regex, FoldedKeyword::new(word, filter.exact))
            }
        };

        Ok(Self {
            filter: filter.clone(),
            source,
            regex,
            fallback,
        })
    }

    #[inline]
    pub fn filter(&self) -> &KeywordFilter {
        &self.filter
    }

    /// Regex source this keyword was compiled from.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn applies_to_comments(&self) -> bool {
        self.filter.comments
    }

    pub fn matches(&self, text: &str) -> bool {
        self.matches_prepared(&PreparedText::new(text))
    }

    pub fn matches_prepared(&self, text: &PreparedText<'_>) -> bool {
        matches_prepared(&self.regex, text, self.fallback.as_ref())
    }
}

/// Deterministic signature of a keyword list.
///
/// Order-insensitive. Covers every field that changes compiled behavior.
pub fn keyword_list_signature(filters: &[KeywordFilter]) -> String {
    let mut parts: Vec<String> = filters
        .iter()
        .map(|filter| match filter.regex_flags.as_deref() {
            Some(flags) => format!("/{}/{}|{}", filter.word, flags, filter.comments),
            None => format!("{}|{}|{}", filter.word.trim().to_lowercase(), filter.exact, filter.comments),
        })
        .collect();
    parts.sort_unstable();
    parts.join("\n")
}

/// A compiled keyword list. Entries that fail to compile are dropped.
#[derive(Debug, Clone, Default)]
pub struct CompiledKeywords {
    signature: String,
    keywords: Vec<CompiledKeyword>,
    dropped: usize,
}

impl CompiledKeywords {
    pub fn compile(filters: &[KeywordFilter]) -> Self {
        let mut keywords = Vec::with_capacity(filters.len());
        let mut dropped = 0;

        for filter in filters {
            match CompiledKeyword::compile(filter) {
                Ok(keyword) => keywords.push(keyword),
                Err(e) => {
                    log::warn!("Dropping keyword {:?}: {}", filter.word, e);
                    dropped += 1;
                }
            }
        }

        Self {
            signature: keyword_list_signature(filters),
            keywords,
            dropped,
        }
    }

    #[inline]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    /// Entries rejected at compile time.
    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledKeyword> {
        self.keywords.iter()
    }

    /// First keyword matching the text.
    pub fn first_match(&self, text: &str) -> Option<&CompiledKeyword> {
        let prepared = PreparedText::new(text);
        self.keywords.iter().find(|keyword| keyword.matches_prepared(&prepared))
    }

    /// First comment-scoped keyword matching the text.
    pub fn first_comment_match(&self, text: &str) -> Option<&CompiledKeyword> {
        let prepared = PreparedText::new(text);
        self.keywords
            .iter()
            .filter(|keyword| keyword.applies_to_comments())
            .find(|keyword| keyword.matches_prepared(&prepared))
    }

    #[inline]
    pub fn matches(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }
}
