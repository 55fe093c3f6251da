//! Channel URL helpers
//!
//! Channel references arrive as full URLs, host-relative paths
//! (`/@handle`, `/channel/UC...`) or bare paths (`c/Name`). These functions
//! slice them without a full URL parser.

use std::borrow::Cow;

// =============================================================================
// Scheme / Origin
// =============================================================================

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();
    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    // The scheme must be a plain token, otherwise the colon belongs to something else
    if colon_pos == 0 || !bytes[..colon_pos].iter().all(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'-' || *b == b'.') {
        return None;
    }

    if bytes.len() > colon_pos + 2 && bytes[colon_pos + 1] == b'/' && bytes[colon_pos + 2] == b'/' {
        return Some(colon_pos + 3);
    }

    None
}

/// Does the first path segment look like a host name?
#[inline]
fn looks_like_host(segment: &str) -> bool {
    let lower = segment.to_ascii_lowercase();
    lower.contains('.')
        && !lower.starts_with('@')
        && lower
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b':')
}

/// Strip scheme, host, query and fragment; return the path without
/// surrounding slashes.
///
/// `https://www.youtube.com/@foo/videos?x=1` → `@foo/videos`
pub fn strip_origin(input: &str) -> &str {
    let mut rest = input.trim();

    if let Some(scheme_end) = get_scheme_end(rest) {
        rest = &rest[scheme_end..];
        rest = match rest.find('/') {
            Some(pos) => &rest[pos..],
            None => "",
        };
    } else if let Some(first) = rest.split(['/', '?', '#']).next() {
        if looks_like_host(first) {
            rest = &rest[first.len()..];
        }
    }

    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    rest[..end].trim_matches('/')
}

/// Does the input look like a channel URL or path rather than a free-form name?
pub fn is_channel_path(input: &str) -> bool {
    let trimmed = input.trim();
    if get_scheme_end(trimmed).is_some() || trimmed.starts_with('/') {
        return true;
    }

    let lower = trimmed.to_ascii_lowercase();
    if let Some(first) = lower.split('/').next() {
        if looks_like_host(first) && lower.contains('/') {
            return true;
        }
    }

    lower.starts_with("channel/") || lower.starts_with("c/") || lower.starts_with("user/")
}

/// Path segments of a channel URL, percent-decoded.
pub fn path_segments(input: &str) -> Vec<Cow<'_, str>> {
    strip_origin(input)
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(percent_decode)
        .collect()
}

// =============================================================================
// Percent Decoding
// =============================================================================

/// Decode percent escapes; returns the input unchanged if decoding fails.
pub fn percent_decode(input: &str) -> Cow<'_, str> {
    if !input.contains('%') {
        return Cow::Borrowed(input);
    }
    match urlencoding::decode(input) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(input),
    }
}
