//! Individual field matchers over store detail-page markup.
//!
//! Each matcher is independent and returns `None` when its pattern does not
//! apply. Ordering between matchers of the same field lives in
//! [`super::extract`].

use crate::metadata::normalize::{description_text, row_text};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// URL marker of low-resolution anchor thumbnails in the screenshot strip
pub const THUMBNAIL_MARKER: &str = "cp-anchor";

const ICON_ALT: &str = "Icon image";
const ICON_CLASS_PREFIX: &str = "T75aBb";
const SCREENSHOT_ALTS: [&str; 2] = ["Screenshot Image", "صورة لقطة الشاشة"];

static IMG_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<img\b[^>]*>").expect("Failed to compile img regex"));

static SRC_ATTR_REGEX: Lazy<Regex> =
    Lazy::new(|| attr_regex("src"));
static ALT_ATTR_REGEX: Lazy<Regex> =
    Lazy::new(|| attr_regex("alt"));
static CLASS_ATTR_REGEX: Lazy<Regex> =
    Lazy::new(|| attr_regex("class"));
static ITEMPROP_ATTR_REGEX: Lazy<Regex> =
    Lazy::new(|| attr_regex("itemprop"));

static RATING_STRUCTURED_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#""(?:starRating|aggregateRating)"\s*:\s*\{[^{}]*?"?ratingValue"?\s*:\s*"?([0-9]+(?:\.[0-9]+)?)"?"#,
    )
    .expect("Failed to compile structured rating regex")
});

static RATING_ARIA_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)aria-label="[^"]*?([0-5]\.[0-9])[^"]*?(?:stars?|out of|نجوم)"#)
        .expect("Failed to compile aria rating regex")
});

static RATING_TEXT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)>\s*([0-5]\.[0-9])\s*<[^\n]*?star")
        .expect("Failed to compile visible rating regex")
});

static DOWNLOADS_TEXT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)>\s*([0-9][0-9,.]*\s*(?:[KMB]|ألف|مليون)?\s*\+)\s*(?:downloads|عملية تنزيل)")
        .expect("Failed to compile downloads regex")
});

static DOWNLOADS_SCRIPT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\["([0-9][0-9,.]*[KMB]?\+)"\]"#).expect("Failed to compile script downloads regex")
});

static DESCRIPTION_DATA_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)data-g-id="description"[^>]*>(.*?)</div>"#)
        .expect("Failed to compile description regex")
});

static DESCRIPTION_ITEMPROP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)itemprop="description"[^>]*><div[^>]*>(.*?)</div></div>"#)
        .expect("Failed to compile itemprop description regex")
});

static REVIEWS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)>\s*([0-9][0-9,.]*\s*(?:K|M|B|ألف|مليون)?)\s*(?:reviews|مراجعة)\s*<")
        .expect("Failed to compile reviews regex")
});

static UPDATED_ON_REGEX: Lazy<Regex> = Lazy::new(|| row_regex("Updated on|تاريخ التحديث"));
static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| row_regex("Current version|الإصدار الحالي"));

fn attr_regex(name: &str) -> Regex {
    Regex::new(&format!(r#"(?i)\s{name}\s*=\s*"([^"]*)""#)).expect("Failed to compile attribute regex")
}

/// A labelled metadata row followed by its value block.
fn row_regex(labels: &str) -> Regex {
    Regex::new(&format!(r"(?is)>\s*(?:{labels})\s*</div>.*?<div[^>]*>(.*?)</div>"))
        .expect("Failed to compile row regex")
}

fn capture<'a>(regex: &Regex, markup: &'a str) -> Option<&'a str> {
    regex
        .captures(markup)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn attr<'a>(regex: &Regex, tag: &'a str) -> Option<&'a str> {
    capture(regex, tag)
}

fn img_tags(markup: &str) -> impl Iterator<Item = &str> {
    IMG_TAG_REGEX.find_iter(markup).map(|m| m.as_str())
}

/// Source of the first `<img>` satisfying `predicate`
fn find_img_src(markup: &str, predicate: impl Fn(&str) -> bool) -> Option<String> {
    img_tags(markup)
        .filter(|tag| predicate(tag))
        .find_map(|tag| attr(&SRC_ATTR_REGEX, tag))
        .filter(|src| !src.is_empty())
        .map(str::to_string)
}

fn parse_rating(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|rating| (0.0..=5.0).contains(rating))
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

pub fn icon_by_alt(markup: &str) -> Option<String> {
    find_img_src(markup, |tag| {
        attr(&ALT_ATTR_REGEX, tag).is_some_and(|alt| alt.eq_ignore_ascii_case(ICON_ALT))
    })
}

pub fn icon_by_class(markup: &str) -> Option<String> {
    find_img_src(markup, |tag| {
        attr(&CLASS_ATTR_REGEX, tag).is_some_and(|class| {
            class
                .split_whitespace()
                .any(|name| name.starts_with(ICON_CLASS_PREFIX))
        })
    })
}

pub fn icon_by_itemprop(markup: &str) -> Option<String> {
    find_img_src(markup, |tag| {
        attr(&ITEMPROP_ATTR_REGEX, tag).is_some_and(|prop| prop.eq_ignore_ascii_case("image"))
    })
}

pub fn rating_structured(markup: &str) -> Option<f64> {
    capture(&RATING_STRUCTURED_REGEX, markup).and_then(parse_rating)
}

pub fn rating_aria_label(markup: &str) -> Option<f64> {
    capture(&RATING_ARIA_REGEX, markup).and_then(parse_rating)
}

pub fn rating_visible_text(markup: &str) -> Option<f64> {
    capture(&RATING_TEXT_REGEX, markup).and_then(parse_rating)
}

pub fn downloads_visible_text(markup: &str) -> Option<String> {
    capture(&DOWNLOADS_TEXT_REGEX, markup).map(|m| m.trim().to_string())
}

pub fn downloads_script_data(markup: &str) -> Option<String> {
    capture(&DOWNLOADS_SCRIPT_REGEX, markup).map(|m| m.trim().to_string())
}

pub fn description_data_attr(markup: &str) -> Option<String> {
    capture(&DESCRIPTION_DATA_REGEX, markup)
        .map(description_text)
        .and_then(non_blank)
}

pub fn description_itemprop(markup: &str) -> Option<String> {
    capture(&DESCRIPTION_ITEMPROP_REGEX, markup)
        .map(description_text)
        .and_then(non_blank)
}

pub fn reviews_visible_text(markup: &str) -> Option<String> {
    capture(&REVIEWS_REGEX, markup)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

pub fn updated_on_row(markup: &str) -> Option<String> {
    capture(&UPDATED_ON_REGEX, markup)
        .map(row_text)
        .filter(|text| !text.is_empty())
}

pub fn version_row(markup: &str) -> Option<String> {
    capture(&VERSION_REGEX, markup)
        .map(row_text)
        .filter(|text| !text.is_empty())
}

fn is_screenshot(tag: &str) -> bool {
    attr(&ALT_ATTR_REGEX, tag).is_some_and(|alt| {
        SCREENSHOT_ALTS
            .iter()
            .any(|expected| alt.eq_ignore_ascii_case(expected))
    })
}

/// Every screenshot source in order of appearance.
///
/// Duplicates and anchor thumbnails are skipped.
pub fn screenshots(markup: &str) -> Vec<String> {
    let (urls, _) = img_tags(markup)
        .filter(|tag| is_screenshot(tag))
        .filter_map(|tag| attr(&SRC_ATTR_REGEX, tag))
        .filter(|src| !src.is_empty() && !src.contains(THUMBNAIL_MARKER))
        .fold(
            (Vec::new(), HashSet::new()),
            |(mut urls, mut seen): (Vec<String>, HashSet<&str>), src| {
                if seen.insert(src) {
                    urls.push(src.to_string());
                }
                (urls, seen)
            },
        );
    urls
}
