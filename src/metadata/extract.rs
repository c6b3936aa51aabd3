use crate::metadata::normalize::truncate_description;
use crate::metadata::strategies;
use crate::metadata::types::{AppMetadata, ExtractReport, Markup};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// A named matcher for one field
pub struct Strategy<T> {
    pub name: &'static str,
    pub matcher: fn(&str) -> Option<T>,
}

impl<T> Strategy<T> {
    pub const fn new(name: &'static str, matcher: fn(&str) -> Option<T>) -> Self {
        Self { name, matcher }
    }
}

impl<T> Clone for Strategy<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            matcher: self.matcher,
        }
    }
}

/// Run a chain in order and return the first strategy that matched, with its value.
pub fn first_match<'a, T>(markup: &str, chain: &'a [Strategy<T>]) -> Option<(&'a str, T)> {
    chain
        .iter()
        .find_map(|strategy| (strategy.matcher)(markup).map(|value| (strategy.name, value)))
}

/// Rating sources, orderable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingSource {
    StructuredData,
    AriaLabel,
    VisibleText,
}

impl RatingSource {
    pub const DEFAULT_ORDER: [RatingSource; 3] = [
        RatingSource::StructuredData,
        RatingSource::AriaLabel,
        RatingSource::VisibleText,
    ];

    fn strategy(self) -> Strategy<f64> {
        match self {
            RatingSource::StructuredData => {
                Strategy::new("structured_data", strategies::rating_structured)
            }
            RatingSource::AriaLabel => Strategy::new("aria_label", strategies::rating_aria_label),
            RatingSource::VisibleText => {
                Strategy::new("visible_text", strategies::rating_visible_text)
            }
        }
    }
}

const ICON_CHAIN: [Strategy<String>; 3] = [
    Strategy::new("icon_alt", strategies::icon_by_alt),
    Strategy::new("icon_class", strategies::icon_by_class),
    Strategy::new("itemprop_image", strategies::icon_by_itemprop),
];

const DOWNLOADS_CHAIN: [Strategy<String>; 2] = [
    Strategy::new("visible_text", strategies::downloads_visible_text),
    Strategy::new("script_data", strategies::downloads_script_data),
];

const DESCRIPTION_CHAIN: [Strategy<String>; 2] = [
    Strategy::new("data_g_id", strategies::description_data_attr),
    Strategy::new("itemprop_description", strategies::description_itemprop),
];

const REVIEWS_CHAIN: [Strategy<String>; 1] =
    [Strategy::new("visible_text", strategies::reviews_visible_text)];

const UPDATED_ON_CHAIN: [Strategy<String>; 1] =
    [Strategy::new("row_label", strategies::updated_on_row)];

const VERSION_CHAIN: [Strategy<String>; 1] =
    [Strategy::new("row_label", strategies::version_row)];

static DEFAULT_EXTRACTOR: Lazy<Extractor> = Lazy::new(Extractor::default);

/// Field-by-field extraction over detail-page markup.
///
/// Extraction is total: a field nothing matched keeps its empty value and
/// never affects the others.
pub struct Extractor {
    icon: Vec<Strategy<String>>,
    rating: Vec<Strategy<f64>>,
    downloads: Vec<Strategy<String>>,
    description: Vec<Strategy<String>>,
    reviews: Vec<Strategy<String>>,
    updated_on: Vec<Strategy<String>>,
    version: Vec<Strategy<String>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(&RatingSource::DEFAULT_ORDER)
    }
}

impl Extractor {
    pub fn new(rating_order: &[RatingSource]) -> Self {
        Self {
            icon: ICON_CHAIN.to_vec(),
            rating: rating_order.iter().map(|source| source.strategy()).collect(),
            downloads: DOWNLOADS_CHAIN.to_vec(),
            description: DESCRIPTION_CHAIN.to_vec(),
            reviews: REVIEWS_CHAIN.to_vec(),
            updated_on: UPDATED_ON_CHAIN.to_vec(),
            version: VERSION_CHAIN.to_vec(),
        }
    }

    #[allow(dead_code)]
    pub fn extract(&self, markup: &Markup, app_id: &str, source_url: &str) -> AppMetadata {
        self.extract_with_report(markup, app_id, source_url).0
    }

    pub fn extract_with_report(
        &self,
        markup: &Markup,
        app_id: &str,
        source_url: &str,
    ) -> (AppMetadata, ExtractReport) {
        let html = markup.as_str();
        let mut report = ExtractReport::default();

        let mut run = |field: &str, chain: &[Strategy<String>]| -> String {
            let found = first_match(html, chain);
            report.record(field, found.as_ref().map(|(name, _)| *name));
            found.map(|(_, value)| value).unwrap_or_default()
        };

        let icon_url = run("iconUrl", &self.icon);
        let downloads = run("downloads", &self.downloads);
        let full_description = run("description", &self.description);
        let reviews_count = run("reviewsCount", &self.reviews);
        let updated_on = run("updatedOn", &self.updated_on);
        let version = run("version", &self.version);

        let rating = first_match(html, &self.rating);
        report.record("rating", rating.as_ref().map(|(name, _)| *name));
        let rating = rating.map(|(_, value)| value).unwrap_or_default();

        let screenshots = strategies::screenshots(html);
        report.record(
            "screenshots",
            (!screenshots.is_empty()).then_some("screenshot_alt"),
        );

        let misses: Vec<&str> = report
            .field_decisions
            .iter()
            .filter(|d| d.winner.is_none())
            .map(|d| d.field.as_str())
            .collect();
        log::debug!(
            "app_id={app_id} extracted bytes={} misses=[{}]",
            html.len(),
            misses.join(",")
        );

        let metadata = AppMetadata {
            id: app_id.to_string(),
            icon_url,
            rating,
            downloads,
            description: truncate_description(&full_description),
            full_description,
            screenshots,
            reviews_count,
            updated_on,
            version,
            source_url: source_url.to_string(),
        };

        (metadata, report)
    }
}

/// Extract with the default strategy order.
#[allow(dead_code)]
pub fn extract(markup: &Markup, app_id: &str, source_url: &str) -> AppMetadata {
    DEFAULT_EXTRACTOR.extract(markup, app_id, source_url)
}
