//! Text and HTML cleanup applied to bookmark content before it goes into the feed.
//!
//! Markup is matched with regular expressions rather than parsed, so malformed
//! HTML passes through instead of failing. Every function here is total.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").expect("valid img regex"));

/// One attribute: name, then an optional double-quoted, single-quoted or bare value.
static IMG_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+)))?"#)
        .expect("valid attribute regex")
});

static READABILITY_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*<div\s+id="readability-page-1"[^>]*>"#).expect("valid wrapper regex")
});

static READABILITY_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</div>\s*</div>\s*$").expect("valid wrapper close regex"));

/// Named entities decoded by [`clean_entities`]. `&amp;` must stay last.
const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&rsquo;", "\u{2019}"),
    ("&lsquo;", "\u{2018}"),
    ("&ldquo;", "\u{201C}"),
    ("&rdquo;", "\u{201D}"),
    ("&mdash;", "\u{2014}"),
    ("&ndash;", "\u{2013}"),
    ("&hellip;", "\u{2026}"),
    ("&amp;", "&"),
];

/// CP1252 renderings of UTF-8 punctuation. The bare `â€` prefix goes last.
const MOJIBAKE: &[(&str, &str)] = &[
    ("â€™", "'"),
    ("â€œ", "\""),
    ("â€\u{9d}", "\""),
    ("â€“", "-"),
    ("â€”", "-"),
    ("â€¦", "..."),
    ("â€˜", "'"),
    ("â€", ""),
];

/// Straightens smart punctuation and applies NFKC.
///
/// NFKC runs first: some compatibility forms (U+FE58 small em dash, for one)
/// fold into the very punctuation being straightened.
pub fn normalize_text(input: &str) -> String {
    input
        .nfkc()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{00A0}' => ' ',
            other => other,
        })
        .collect()
}

/// Decodes the handful of named entities that leak through extracted article HTML.
pub fn clean_entities(input: &str) -> String {
    ENTITIES
        .iter()
        .fold(input.to_string(), |acc, (entity, literal)| {
            acc.replace(entity, literal)
        })
}

/// Repairs UTF-8 punctuation that was decoded as Windows-1252 somewhere upstream.
pub fn clean_mojibake(input: &str) -> String {
    MOJIBAKE
        .iter()
        .fold(input.to_string(), |acc, (broken, fixed)| acc.replace(broken, fixed))
}

/// Removes the `<div id="readability-page-1">` wrapper added by the reader-view
/// extractor, along with its trailing `</div></div>`.
pub fn strip_readability_wrapper(html: &str) -> String {
    let Some(open) = READABILITY_OPEN.find(html) else {
        return html.to_string();
    };

    let inner = &html[open.end()..];
    READABILITY_CLOSE.replace(inner, "").into_owned()
}

/// Drops every `<img>` whose `src` was already seen earlier in the document.
pub fn remove_duplicate_images(html: &str) -> String {
    let mut seen = HashSet::new();

    IMG_TAG
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            match image_src(tag) {
                Some(src) if !seen.insert(src.to_string()) => String::new(),
                _ => tag.to_string(),
            }
        })
        .into_owned()
}

/// Returns the full markup of the first `<img>` tag, if any.
pub fn extract_first_image(html: &str) -> Option<&str> {
    IMG_TAG.find(html).map(|m| m.as_str())
}

fn image_src(tag: &str) -> Option<&str> {
    // Skip "<img" so the tag name is not read as an attribute.
    let attrs = tag.get(4..)?;
    IMG_ATTR
        .captures_iter(attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case("src"))
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4)))
        .map(|m| m.as_str())
}
