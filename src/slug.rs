//! Slug normalization for tool names.
//!
//! Saved tools are keyed by a normalized identifier: lowercase
//! alphanumerics separated by single hyphens.

use regex::Regex;
use std::sync::OnceLock;

fn strip_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // ASCII word class only; anything else cannot appear in a slug.
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\s-]").expect("valid regex"))
}

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s_]+").expect("valid regex"))
}

fn hyphen_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-+").expect("valid regex"))
}

fn slug_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid regex"))
}

/// Convert an arbitrary string to a slug: lowercase, drop characters
/// outside word/space/hyphen, collapse whitespace and underscores to
/// hyphens, collapse hyphen runs, trim leading/trailing hyphens.
pub fn to_slug(s: &str) -> String {
    let lowered = s.to_lowercase();
    let stripped = strip_re().replace_all(lowered.trim(), "");
    let hyphenated = separator_re().replace_all(&stripped, "-");
    let collapsed = hyphen_run_re().replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}

/// True iff `s` is a valid slug: `^[a-z0-9]+(-[a-z0-9]+)*$`.
pub fn is_valid_slug(s: &str) -> bool {
    !s.is_empty() && slug_re().is_match(s)
}
