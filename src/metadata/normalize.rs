use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length of the short description, in characters
pub const DESCRIPTION_LIMIT: usize = 500;
pub const ELLIPSIS: &str = "...";

static BREAK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("Failed to compile line break regex"));

static TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("Failed to compile tag regex"));

/// Remove every markup tag, keeping the text between them.
pub fn strip_tags(html: &str) -> String {
    TAG_REGEX.replace_all(html, "").into_owned()
}

/// Decode the entities the store escapes in description text.
///
/// Only `&quot;` and `&amp;` are handled, in that order, so `&amp;quot;`
/// decodes to `&quot;` rather than a quote.
pub fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"").replace("&amp;", "&")
}

/// Turn a description block into plain text.
///
/// Line breaks become `\n`, remaining tags are stripped and entities decoded.
/// Whitespace is left untouched.
pub fn description_text(html: &str) -> String {
    let with_newlines = BREAK_REGEX.replace_all(html, "\n");
    decode_entities(&strip_tags(&with_newlines))
}

/// Text of a metadata row value: tags stripped and trimmed.
pub fn row_text(html: &str) -> String {
    strip_tags(html).trim().to_string()
}

/// Derive the short description from the full one.
///
/// Counts characters rather than bytes, so multi-byte text is never split
/// inside a code point.
pub fn truncate_description(full: &str) -> String {
    match full.char_indices().nth(DESCRIPTION_LIMIT) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &full[..cut]),
        None => full.to_string(),
    }
}
