//! Channel Identity Canonicalizer
//!
//! A channel can be named four incompatible ways: an opaque UC-id, an
//! `@handle`, a legacy custom URL (`c/Name`, `user/Name`) or a display name.
//! These functions turn arbitrary input into one canonical form per identifier
//! space. They are total: bad input yields `None` or an empty string.

use std::borrow::Cow;

use crate::normalize::{fold_typography, is_invisible, normalize_for_comparison};
use crate::url::{is_channel_path, path_segments, percent_decode};

// =============================================================================
// UC-id
// =============================================================================

/// Number of characters after the `UC` prefix.
pub const UC_ID_BODY_LEN: usize = 22;

#[inline]
fn is_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Find the first UC-id in the string, preserving its case.
///
/// Matches `UC[A-Za-z0-9_-]{22}` case-insensitively anywhere in the string.
pub fn find_uc_id(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let total = UC_ID_BODY_LEN + 2;
    if bytes.len() < total {
        return None;
    }

    for start in 0..=bytes.len() - total {
        if !bytes[start].eq_ignore_ascii_case(&b'u') || !bytes[start + 1].eq_ignore_ascii_case(&b'c') {
            continue;
        }
        if bytes[start + 2..start + total].iter().all(|&b| is_id_byte(b)) {
            return Some(&s[start..start + total]);
        }
    }

    None
}

/// True when the whole string is exactly one UC-id.
pub fn is_uc_id(s: &str) -> bool {
    let s = s.trim();
    s.len() == UC_ID_BODY_LEN + 2 && find_uc_id(s) == Some(s)
}

/// `""` or the lowercased UC-id found anywhere in the string.
pub fn normalize_uc_id(s: &str) -> String {
    find_uc_id(s).map(|id| id.to_ascii_lowercase()).unwrap_or_default()
}

// =============================================================================
// Handles
// =============================================================================

/// Characters that end a handle inside a longer string.
#[inline]
fn is_handle_terminator(c: char) -> bool {
    c.is_whitespace()
        || matches!(c, '/' | '?' | '#' | '"' | '\'' | '<' | '>' | '&' | '•' | '·')
}

fn clean_handle_body(body: &str) -> String {
    let decoded = percent_decode(body);
    let end = decoded.find(is_handle_terminator).unwrap_or(decoded.len());
    decoded[..end]
        .chars()
        .filter(|c| !is_invisible(*c))
        .map(fold_typography)
        .collect()
}

/// Extract `@handle` from arbitrary text, preserving case.
///
/// Scans for `@`, copies until a terminator, decodes percent-escapes, strips
/// invisible code points and folds typographic quotes and dashes.
pub fn extract_raw_handle(s: &str) -> Option<String> {
    let source = if s.contains('@') || s.contains('\u{FF20}') {
        Cow::Borrowed(s)
    } else if s.contains("%40") {
        percent_decode(s)
    } else {
        return None;
    };

    let at = source.find(['@', '\u{FF20}'])?;
    let at_len = source[at..].chars().next().map_or(1, char::len_utf8);

    // Fold first so curly and straight quotes terminate identically
    let rest: String = source[at + at_len..].chars().map(fold_typography).collect();
    let end = rest.find(is_handle_terminator).unwrap_or(rest.len());

    let body = clean_handle_body(&rest[..end]);
    if body.is_empty() {
        return None;
    }

    Some(format!("@{body}"))
}

/// Canonical handle form for equality: `""` or `"@lowercasehandle"`.
///
/// Strings that are actually UC-ids are rejected.
pub fn normalize_handle_for_comparison(s: &str) -> String {
    let Some(handle) = extract_raw_handle(s) else {
        return String::new();
    };

    let body = &handle[1..];
    if is_uc_id(body) {
        return String::new();
    }

    let folded = normalize_for_comparison(body);
    if folded.is_empty() {
        return String::new();
    }

    format!("@{folded}")
}

// =============================================================================
// Custom URLs
// =============================================================================

/// `""`, `"c/name"` or `"user/name"`, lowercased.
pub fn normalize_custom_url(s: &str) -> String {
    let segments = path_segments(s);
    let mut iter = segments.iter();

    let prefix = match iter.next().map(|p| p.to_ascii_lowercase()) {
        Some(p) if p == "c" || p == "user" => p,
        _ => return String::new(),
    };

    let name = match iter.next() {
        Some(name) => normalize_for_comparison(name),
        None => return String::new(),
    };
    if name.is_empty() {
        return String::new();
    }

    format!("{prefix}/{name}")
}

// =============================================================================
// Arbitrary Input
// =============================================================================

/// Which identifier space a canonicalized input belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelInputKind {
    UcId,
    Handle,
    CustomUrl,
    Unknown,
}

impl ChannelInputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UcId => "ucid",
            Self::Handle => "handle",
            Self::CustomUrl => "customUrl",
            Self::Unknown => "unknown",
        }
    }
}

/// Result of canonicalizing a user-supplied channel reference.
///
/// `value` keeps display casing: `UC...`, `@Handle`, `c/Name`, or the trimmed
/// input for `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalChannel {
    pub kind: ChannelInputKind,
    pub value: String,
}

fn from_channel_path(input: &str) -> Option<CanonicalChannel> {
    let segments = path_segments(input);
    let first = segments.first()?;

    if first.eq_ignore_ascii_case("channel") {
        let id = find_uc_id(segments.get(1)?)?;
        return Some(CanonicalChannel {
            kind: ChannelInputKind::UcId,
            value: id.to_string(),
        });
    }

    if first.starts_with('@') {
        return extract_raw_handle(first).map(|value| CanonicalChannel {
            kind: ChannelInputKind::Handle,
            value,
        });
    }

    if first.eq_ignore_ascii_case("c") || first.eq_ignore_ascii_case("user") {
        let name = segments.get(1)?;
        let name: String = name.chars().filter(|c| !is_invisible(*c)).collect();
        if name.trim().is_empty() {
            return None;
        }
        return Some(CanonicalChannel {
            kind: ChannelInputKind::CustomUrl,
            value: format!("{}/{}", first.to_ascii_lowercase(), name.trim()),
        });
    }

    None
}

/// Classify a typed or pasted channel reference.
///
/// Tries URL-path extraction first, then the UC-id pattern, then handle
/// extraction.
pub fn canonicalize_channel_input(raw: &str) -> CanonicalChannel {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return CanonicalChannel {
            kind: ChannelInputKind::Unknown,
            value: String::new(),
        };
    }

    if is_channel_path(trimmed) {
        if let Some(canonical) = from_channel_path(trimmed) {
            return canonical;
        }
    }

    if let Some(id) = find_uc_id(trimmed) {
        return CanonicalChannel {
            kind: ChannelInputKind::UcId,
            value: id.to_string(),
        };
    }

    if let Some(handle) = extract_raw_handle(trimmed) {
        return CanonicalChannel {
            kind: ChannelInputKind::Handle,
            value: handle,
        };
    }

    CanonicalChannel {
        kind: ChannelInputKind::Unknown,
        value: trimmed.to_string(),
    }
}
