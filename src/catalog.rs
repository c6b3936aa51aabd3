use crate::metadata::{AppMetadata, MetadataService};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A known app listed by the storefront
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub developer: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Mirror outside the store, if any
    #[serde(default)]
    pub direct_download_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

impl CatalogEntry {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: String::new(),
            developer: String::new(),
            description: String::new(),
            category: None,
            direct_download_url: None,
            featured: false,
        }
    }

    /// Case-insensitive category comparison
    pub fn in_category(&self, category: &str) -> bool {
        self.category
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(category))
    }

    fn matches(&self, needle: &str) -> bool {
        [
            self.title.as_str(),
            self.description.as_str(),
            self.category.as_deref().unwrap_or_default(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Catalog entry paired with its scraped metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogListing {
    pub entry: CatalogEntry,
    pub metadata: AppMetadata,
    pub degraded: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries whose title, description or category contains `query`,
    /// ignoring case. A blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<&CatalogEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let hits: Vec<&CatalogEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.matches(&needle))
            .collect();
        log::debug!("catalog search query={query:?} hits={}", hits.len());
        hits
    }

    /// Fetch metadata for every entry in parallel.
    ///
    /// Each entry is independent; a failing app yields a degraded listing and
    /// never affects the rest. Output keeps catalog order.
    pub fn refresh(&self, service: &MetadataService) -> Vec<CatalogListing> {
        self.entries
            .par_iter()
            .map(|entry| {
                let (metadata, degraded) = match service.get_app_metadata(&entry.id) {
                    Ok(outcome) => {
                        let degraded = outcome.is_degraded();
                        (outcome.into_metadata(), degraded)
                    }
                    Err(err) => {
                        log::warn!("app_id={:?} skipped: {err}", entry.id);
                        (
                            AppMetadata::degraded(&entry.id, &service.detail_url(&entry.id)),
                            true,
                        )
                    }
                };

                CatalogListing {
                    entry: entry.clone(),
                    metadata,
                    degraded,
                }
            })
            .collect()
    }
}
