//! Category code inference
//!
//! Fills in a code when the page does not provide one. Not collision-free:
//! two slugs with the same initials infer the same code.

use regex::Regex;
use std::sync::LazyLock;

/// Code used when nothing can be derived from the URL
pub const FALLBACK_CODE: &str = "XX";

static CODE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[/_])([A-Z]{2,3})_\w+\.html?$").expect("valid code pattern")
});

/// Infers a category code from a URL or path
///
/// In order of preference:
/// 1. An uppercase prefix opening the last segment (or following `_` in it),
///    e.g. `GI_guitars.html` → `GI`
/// 2. Initials of the first two words of the last path segment,
///    e.g. `some_category.html` → `SC`
/// 3. The first two characters of that segment, uppercased, or `XX`
///
/// # Examples
///
/// ```
/// use shelf_mapper::extract::infer_code;
///
/// assert_eq!(infer_code("/de/GI_guitars.html"), "GI");
/// assert_eq!(infer_code("/de/some_category.html"), "SC");
/// assert_eq!(infer_code("/de/pa.html"), "PA");
/// ```
pub fn infer_code(url: &str) -> String {
    let path = strip_query(url);

    if let Some(captures) = CODE_PREFIX.captures(path) {
        return captures[1].to_string();
    }

    let words = slug_words(path);
    if words.len() >= 2 {
        return words
            .iter()
            .take(2)
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .collect();
    }

    let cleaned: String = words.concat();
    let code: String = cleaned.chars().take(2).flat_map(char::to_uppercase).collect();
    if code.is_empty() {
        FALLBACK_CODE.to_string()
    } else {
        code
    }
}

/// Human-readable name derived from the last path segment
///
/// `drums_und_percussion.html` → `drums und percussion`
pub fn slug_name(url: &str) -> String {
    slug_words(strip_query(url)).join(" ")
}

fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Words of the last path segment, extension removed
fn slug_words(path: &str) -> Vec<&str> {
    let segment = path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("");
    let stem = match segment.rfind('.') {
        Some(dot) if dot > 0 => &segment[..dot],
        _ => segment,
    };

    stem.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .collect()
}
