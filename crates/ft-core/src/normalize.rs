//! Unicode folding for comparisons
//!
//! Every identity and keyword comparison goes through these helpers so that
//! decomposed accents, zero-width characters and typographic punctuation never
//! change a match decision.

use std::borrow::Cow;

use unicode_normalization::UnicodeNormalization;

// =============================================================================
// Character Classes
// =============================================================================

/// Zero-width and variation-selector code points.
#[inline]
pub fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FE00}'..='\u{FE0F}'
            | '\u{FEFF}'
            | '\u{E0100}'..='\u{E01EF}'
    )
}

/// Combining diacritical marks block.
#[inline]
pub fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}

/// Map curly quotes, typographic dashes and fullwidth `@` to ASCII.
#[inline]
pub fn fold_typography(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '\u{02BC}' | '\u{FF07}' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{FF02}' => '"',
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}' | '\u{2212}' => '-',
        '\u{FF20}' => '@',
        _ => c,
    }
}

// =============================================================================
// String Folding
// =============================================================================

/// Remove zero-width and variation-selector code points.
pub fn strip_invisible(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_invisible) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|c| !is_invisible(*c)).collect())
}

/// Decompose, drop combining marks and invisible code points, recompose.
///
/// Case is preserved.
pub fn strip_diacritics(s: &str) -> Cow<'_, str> {
    if s.is_ascii() {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.nfd()
            .filter(|c| !is_combining_mark(*c) && !is_invisible(*c))
            .nfc()
            .collect(),
    )
}

/// Canonical comparison form: diacritics and invisibles stripped, typography
/// folded, lowercased, whitespace collapsed.
pub fn normalize_for_comparison(s: &str) -> String {
    let stripped = strip_diacritics(s);
    let mut out = String::with_capacity(stripped.len());
    let mut pending_space = false;

    for c in stripped.chars().map(fold_typography) {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.extend(c.to_lowercase());
    }

    out
}
