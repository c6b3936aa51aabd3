pub mod extract;
pub mod fetcher;
pub mod normalize;
pub mod strategies;
pub mod types;

pub use extract::{Extractor, RatingSource};
pub use fetcher::{PageFetcher, StoreFetcher};
pub use types::{
    AppMetadata, DegradeReason, ExtractReport, FetchError, Markup, MetadataError,
    MetadataOutcome,
};

use crate::config::Config;
use std::panic::{self, AssertUnwindSafe};

/// Fetch + extract for one app id at a time.
///
/// Holds no per-request state; concurrent calls for different ids need no
/// coordination.
pub struct MetadataService {
    fetcher: Box<dyn PageFetcher>,
    extractor: Extractor,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn processing_failure(
    app_id: &str,
    source_url: &str,
    stage: &str,
    payload: &(dyn std::any::Any + Send),
) -> MetadataOutcome {
    let msg = panic_message(payload);
    log::error!("app_id={app_id} outcome=degraded err={stage} panicked: {msg}");
    MetadataOutcome::Degraded {
        metadata: AppMetadata::degraded(app_id, source_url),
        reason: DegradeReason::Processing(msg),
    }
}

impl MetadataService {
    pub fn new(fetcher: Box<dyn PageFetcher>, extractor: Extractor) -> Self {
        Self { fetcher, extractor }
    }

    /// Service talking to the real store, configured from `config`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let fetcher = StoreFetcher::new(config.store.clone())?;
        let extractor = Extractor::new(&config.extract.rating_order);
        Ok(Self::new(Box::new(fetcher), extractor))
    }

    pub fn detail_url(&self, app_id: &str) -> String {
        self.fetcher.detail_url(app_id)
    }

    /// Metadata for `app_id`.
    ///
    /// The only error is a missing id. Fetch failures and panics while
    /// fetching or extracting produce a degraded record instead.
    pub fn get_app_metadata(&self, app_id: &str) -> Result<MetadataOutcome, MetadataError> {
        Ok(self.get_app_metadata_with_report(app_id)?.0)
    }

    pub fn get_app_metadata_with_report(
        &self,
        app_id: &str,
    ) -> Result<(MetadataOutcome, ExtractReport), MetadataError> {
        if app_id.trim().is_empty() {
            return Err(MetadataError::MissingAppId);
        }

        let source_url = self.fetcher.detail_url(app_id);

        let fetched = panic::catch_unwind(AssertUnwindSafe(|| self.fetcher.fetch(app_id)));
        let markup = match fetched {
            Ok(Ok(markup)) => markup,
            Ok(Err(err)) => {
                log::warn!("app_id={app_id} outcome=degraded err={err}");
                let outcome = MetadataOutcome::Degraded {
                    metadata: AppMetadata::degraded(app_id, &source_url),
                    reason: err.into(),
                };
                return Ok((outcome, ExtractReport::default()));
            }
            Err(payload) => {
                let outcome = processing_failure(app_id, &source_url, "fetch", payload.as_ref());
                return Ok((outcome, ExtractReport::default()));
            }
        };

        Ok(self.extract_guarded(&markup, app_id, &source_url))
    }

    /// Run the extractor over already-fetched markup, absorbing panics.
    pub fn extract_guarded(
        &self,
        markup: &Markup,
        app_id: &str,
        source_url: &str,
    ) -> (MetadataOutcome, ExtractReport) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.extractor.extract_with_report(markup, app_id, source_url)
        }));

        match result {
            Ok((metadata, report)) => {
                if metadata.has_any_data() {
                    log::info!("app_id={app_id} outcome=success");
                } else {
                    log::warn!("app_id={app_id} outcome=success but no field matched, markup may have changed");
                }
                (MetadataOutcome::Fresh(metadata), report)
            }
            Err(payload) => {
                let outcome = processing_failure(app_id, source_url, "extraction", payload.as_ref());
                (outcome, ExtractReport::default())
            }
        }
    }
}
