//! Text normalization and word-set comparison
//!
//! Text extracted from a rendered page and text extracted from the MediaWiki
//! API never agree byte for byte: citation markers, punctuation and
//! whitespace differ between the two paths. Both sides are reduced to a
//! canonical form with [`normalize`] and then compared as sets of words.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Bracketed numeric citation markers such as `[1]` or `[23]`.
static REFERENCE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\d+\]").expect("reference marker pattern is valid"));

/// Anything that is neither a Unicode word character nor whitespace.
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("non-word pattern is valid"));

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Reduce raw text to its canonical form.
///
/// Steps run in a fixed order: drop reference markers, turn every non-word
/// character into a space, collapse whitespace runs, lowercase, trim.
/// Empty or whitespace-only input yields an empty string.
pub fn normalize(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let text = REFERENCE_MARKER.replace_all(text, "");
    let text = NON_WORD.replace_all(&text, " ");
    let text = WHITESPACE_RUN.replace_all(&text, " ");

    text.chars().map(lowercase_char).collect::<String>().trim().to_string()
}

/// Context-free, one-to-one lowercase mapping.
///
/// Final sigma stays `σ` and `İ` maps to a bare `i`, so a word lowercases the
/// same wherever it sits.
fn lowercase_char(c: char) -> char {
    match c {
        '\u{130}' => 'i',
        c => c.to_lowercase().next().unwrap_or(c),
    }
}

/// Replace reference markers with a single space.
///
/// Used on HTML-extracted text where a marker may sit between two words.
pub fn strip_reference_markers(text: &str) -> String {
    REFERENCE_MARKER.replace_all(text, " ").into_owned()
}

/// Collapse whitespace runs into single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

/// Set of unique words taken from normalized text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WordSet(BTreeSet<String>);

impl WordSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Words present here but not in `other`, in sorted order.
    pub fn difference(&self, other: &WordSet) -> Vec<String> {
        self.0.difference(&other.0).cloned().collect()
    }
}

impl<'a> FromIterator<&'a str> for WordSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}

fn words(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split(' ').filter(|word| !word.is_empty())
}

/// Number of distinct words in normalized text.
pub fn count_unique_words(normalized: &str) -> usize {
    unique_words(normalized).len()
}

/// Distinct words in normalized text.
pub fn unique_words(normalized: &str) -> WordSet {
    if normalized.trim().is_empty() {
        return WordSet::default();
    }
    words(normalized).collect()
}

/// One-sided differences between two word sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WordSetDiff {
    pub only_in_left: Vec<String>,
    pub only_in_right: Vec<String>,
}

impl WordSetDiff {
    /// True when both sides hold exactly the same vocabulary.
    pub fn is_empty(&self) -> bool {
        self.only_in_left.is_empty() && self.only_in_right.is_empty()
    }
}

impl fmt::Display for WordSetDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "only in left: [{}]; only in right: [{}]",
            self.only_in_left.join(", "),
            self.only_in_right.join(", ")
        )
    }
}

/// Compare the vocabularies of two normalized texts.
pub fn compare(left: &str, right: &str) -> WordSetDiff {
    let left = unique_words(left);
    let right = unique_words(right);

    WordSetDiff {
        only_in_left: left.difference(&right),
        only_in_right: right.difference(&left),
    }
}
