//! Team-name canonicalization and coarse similarity
//!
//! Providers disagree on team names by affixes and abbreviations far
//! more than by typos ("Arsenal FC" vs "Arsenal", "Punjab Kings" vs
//! "Kings XI Punjab"), so similarity is a deliberately coarse,
//! explainable band ladder rather than edit distance.

/// Organizational suffixes that carry no identity on their own.
/// Lowercase; covers football club forms and the common franchise
/// nicknames shared across cricket/basketball league teams.
const TEAM_SUFFIXES: &[&str] = &[
    "fc",
    "afc",
    "cf",
    "sc",
    "cc",
    "united",
    "city",
    "town",
    "county",
    "athletic",
    "albion",
    "rovers",
    "wanderers",
    "hotspur",
    "club",
    "cricket",
    "warriors",
    "kings",
    "royals",
    "super",
    "giants",
    "capitals",
    "indians",
];

/// Lowercase, strip punctuation, collapse whitespace. Keeps every word.
fn clean(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonicalize a team name for exact comparison: `clean` plus removal
/// of organizational suffix words. Pure and total; empty in, empty out.
pub fn normalize(name: &str) -> String {
    let cleaned = clean(name);
    let kept: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|w| !TEAM_SUFFIXES.contains(w))
        .collect();
    // A name made entirely of suffix words keeps its cleaned form
    // ("Warriors" must not normalize to nothing).
    if kept.is_empty() {
        cleaned
    } else {
        kept.join(" ")
    }
}

fn is_significant_token(token: &str) -> bool {
    token.len() > 3 && !TEAM_SUFFIXES.contains(&token)
}

/// Coarse similarity between two team names, in [0, 1].
///
/// Bands: 1.0 exact after cleaning; 0.9 substring containment either
/// direction; 0.8 first-token equality; 0.7 any shared significant
/// token (length > 3, not a suffix word); 0.0 otherwise.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = clean(a);
    let b = clean(b);

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.9;
    }

    let a_tokens: Vec<&str> = a.split_whitespace().collect();
    let b_tokens: Vec<&str> = b.split_whitespace().collect();
    if a_tokens.first() == b_tokens.first() {
        return 0.8;
    }

    let shared_significant = a_tokens
        .iter()
        .filter(|t| is_significant_token(t))
        .any(|t| b_tokens.contains(t));
    if shared_significant {
        return 0.7;
    }

    0.0
}

/// Exact equality after full canonicalization, for the linker's
/// widened-window fallback and verification-time score sourcing.
pub fn names_equal(a: &str, b: &str) -> bool {
    let a = normalize(a);
    !a.is_empty() && a == normalize(b)
}
