mod web;

use crate::config::StoreConfig;
use crate::metadata::{
    fetcher::build_detail_url, Extractor, FetchError, Markup, MetadataService, PageFetcher,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const DETAILS_EN: &str = include_str!("fixtures/details_en.html");
pub const DETAILS_AR: &str = include_str!("fixtures/details_ar.html");

/// Serves canned responses instead of talking to the store.
/// Unknown ids answer 404 like the real store does.
pub struct FixtureFetcher {
    config: StoreConfig,
    pages: HashMap<String, Result<String, FetchError>>,
    calls: Arc<AtomicUsize>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            pages: HashMap::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn page(mut self, app_id: &str, html: &str) -> Self {
        self.pages.insert(app_id.to_string(), Ok(html.to_string()));
        self
    }

    pub fn failure(mut self, app_id: &str, err: FetchError) -> Self {
        self.pages.insert(app_id.to_string(), Err(err));
        self
    }

    /// Shared counter of `fetch` calls, readable after the fetcher is boxed
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl PageFetcher for FixtureFetcher {
    fn detail_url(&self, app_id: &str) -> String {
        build_detail_url(&self.config, app_id)
    }

    fn fetch(&self, app_id: &str) -> Result<Markup, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(app_id) {
            Some(Ok(html)) => Ok(Markup::from(html.as_str())),
            Some(Err(err)) => Err(err.clone()),
            None => Err(FetchError::Status(404)),
        }
    }
}

/// Fetcher that blows up, standing in for an unexpected processing failure
pub struct PanickingFetcher;

impl PageFetcher for PanickingFetcher {
    fn detail_url(&self, app_id: &str) -> String {
        build_detail_url(&StoreConfig::default(), app_id)
    }

    fn fetch(&self, _app_id: &str) -> Result<Markup, FetchError> {
        panic!("fixture fetcher panicked");
    }
}

pub fn service_with(fetcher: impl PageFetcher + 'static) -> MetadataService {
    MetadataService::new(Box::new(fetcher), Extractor::default())
}

pub fn detail_url(app_id: &str) -> String {
    build_detail_url(&StoreConfig::default(), app_id)
}
