//! Document structure extraction.
//!
//! Finds heading-like lines so the chunker can carve the document into
//! sections. Works on plain text: the documents this pipeline sees are
//! usually concatenated docs dumps (`llms-full.txt` style) where headings
//! show up in several shapes:
//!
//! ```text
//! ## Markdown heading
//! 3. Numbered heading
//! Installation: one-line labelled section
//! ALL CAPS HEADING
//! ```
//!
//! ## Detection policy
//!
//! Applied in order to each line, trimmed of surrounding whitespace:
//!
//! 1. A leading marker — one or more `#` followed by whitespace, a numeric
//!    list prefix (`12.` plus whitespace), or a short capitalized phrase
//!    ending in `:` — where the remainder contains at least one word
//!    character.
//! 2. A non-empty line under 100 characters that equals its own upper-cased
//!    form.
//!
//! The all-caps rule is a heuristic and can misfire on short emphatic
//! sentences ("DO NOT DO THIS."). That behavior is deliberate: it matches
//! the system this engine is modeled on, and false sections only cost a
//! little chunking granularity.

/// A detected heading: its display text and the line it sits on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Heading text with any leading marker (`#`, `3.`) stripped.
    pub text: String,
    /// Zero-based line index in the original document.
    pub line: usize,
}

/// Scan `text` line by line and return all detected headings in order.
///
/// An empty vector means the document has no recognizable structure; callers
/// treat it as a single unheaded section.
pub fn extract_structure(text: &str) -> Vec<Heading> {
    text.lines()
        .enumerate()
        .filter_map(|(line, raw)| {
            heading_text(raw).map(|text| Heading { text, line })
        })
        .collect()
}

/// Classify one line, returning the heading text if it is a heading.
fn heading_text(raw: &str) -> Option<String> {
    let line = raw.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(rest) = strip_hash_marker(line) {
        if has_word_char(rest) {
            return Some(rest.trim().to_string());
        }
    }
    if let Some(rest) = strip_numeric_marker(line) {
        if has_word_char(rest) {
            return Some(rest.trim().to_string());
        }
    }
    if let Some(rest) = strip_label_marker(line) {
        if has_word_char(rest) {
            return Some(line.to_string());
        }
    }

    // All-caps heuristic: short line that is already fully upper-cased.
    if line.len() < 100 && line == line.to_uppercase() && has_word_char(line) {
        return Some(line.to_string());
    }

    None
}

/// `## Title` -> `Title`
fn strip_hash_marker(line: &str) -> Option<&str> {
    let rest = line.trim_start_matches('#');
    if rest.len() == line.len() {
        return None;
    }
    rest.strip_prefix(char::is_whitespace)
}

/// `12. Title` -> `Title`
fn strip_numeric_marker(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix('.')?;
    rest.strip_prefix(char::is_whitespace)
}

/// `Installation: run the installer` -> `run the installer`
///
/// The phrase before the colon must start with an uppercase letter and stay
/// short (a long colon-bearing sentence is prose, not a label).
fn strip_label_marker(line: &str) -> Option<&str> {
    const MAX_LABEL_LEN: usize = 40;

    let (label, rest) = line.split_once(':')?;
    let label = label.trim_end();
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
        return None;
    }
    if !label.chars().next().is_some_and(|c| c.is_uppercase()) {
        return None;
    }
    if !label.chars().all(|c| c.is_alphanumeric() || c.is_whitespace()) {
        return None;
    }
    Some(rest)
}

fn has_word_char(s: &str) -> bool {
    s.chars().any(|c| c.is_alphanumeric() || c == '_')
}
