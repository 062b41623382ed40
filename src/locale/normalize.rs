//! Category heading normalization
//!
//! City overview pages are titled "Top cities for Bakeries in" and the like,
//! in whichever language is active. The category name is what remains after
//! removing the localized prefix and the trailing preposition.

use crate::locale::Locale;
use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

static TRAILING_FILLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:in|pour|für|per)\s*$").expect("static regex"));

static PREFIXES: LazyLock<Vec<(Locale, Regex)>> = LazyLock::new(|| {
    [
        (Locale::En, r"(?i)^Top\s+cities\s+for\s+"),
        (Locale::De, r"(?i)^Top\s+Städte\s+für\s+"),
        (Locale::Fr, r"(?i)^Top\s+villes\s+pour\s+"),
        (Locale::It, r"(?i)^Città\s+più\s+importanti\s+per\s+"),
    ]
    .into_iter()
    .map(|(locale, pattern)| (locale, Regex::new(pattern).expect("static regex")))
    .collect()
});

/// Extracts the bare category name from a localized heading
///
/// The prefix of `locale` is removed first; prefixes of the other locales are
/// removed too, since a locale switch that did not take effect leaves the
/// previous language's heading on the page.
///
/// ```
/// use directory_harvest::locale::{normalize_heading, Locale};
///
/// assert_eq!(normalize_heading("Top cities for Bakeries in", Locale::En), "Bakeries");
/// ```
pub fn normalize_heading(heading: &str, locale: Locale) -> String {
    let mut text = WHITESPACE.replace_all(heading.trim(), " ").into_owned();

    let own = PREFIXES.iter().filter(|(l, _)| *l == locale);
    let others = PREFIXES.iter().filter(|(l, _)| *l != locale);
    for (_, prefix) in own.chain(others) {
        text = prefix.replace(&text, "").into_owned();
    }

    text = TRAILING_FILLER.replace(&text, "").into_owned();

    let trimmed = text.trim_matches(|c: char| matches!(c, ' ' | '.' | ',' | '-'));
    let collapsed = WHITESPACE.replace_all(trimmed, " ");
    capitalize_first(collapsed.trim())
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
