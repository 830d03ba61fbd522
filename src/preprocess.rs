// Text preprocessing — canonicalizes raw text before feature extraction.
//
// Every text that reaches the classifier goes through normalize() first,
// both at training time and at classification time, so the feature space
// stays consistent.
//
// The placeholder tokens are plain lowercase words (url, email, num) rather
// than bracketed markers. The punctuation pass would strip brackets on a
// second run, and normalize() must be idempotent: the pipeline may hand
// already-normalized text back through it.

use std::sync::OnceLock;

use regex_lite::Regex;

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+|www\.\S+").expect("static pattern"))
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\S+@\S+").expect("static pattern"))
}

fn punct_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("static pattern"))
}

fn digits_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").expect("static pattern"))
}

/// Normalize raw text for classification.
///
/// Lowercases, collapses whitespace, replaces URLs / email addresses /
/// digit runs with placeholder tokens, and strips punctuation. Pure and
/// total: empty input yields an empty string.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = text.to_lowercase();
    let text = collapse_whitespace(&text);
    let text = url_pattern().replace_all(&text, " url ");
    let text = email_pattern().replace_all(&text, " email ");
    let text = punct_pattern().replace_all(&text, " ");
    let text = digits_pattern().replace_all(&text, "num");
    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
