use crate::config::StoreConfig;
use crate::metadata::types::{FetchError, Markup};
use std::error::Error;
use std::time::Duration;
use url::Url;

/// Retrieves detail-page markup for an app.
///
/// Implementations never retry; that policy belongs to the caller.
pub trait PageFetcher: Send + Sync {
    /// Detail-page URL for `app_id`. Always succeeds so degraded records can carry it.
    fn detail_url(&self, app_id: &str) -> String;

    fn fetch(&self, app_id: &str) -> Result<Markup, FetchError>;
}

/// Fetches pages from the store over HTTP with a browser-like signature
pub struct StoreFetcher {
    client: reqwest::blocking::Client,
    config: StoreConfig,
}

fn get_error(error: &reqwest::Error) -> String {
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

impl StoreFetcher {
    pub fn new(config: StoreConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_idle_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client, config })
    }
}

/// Store base URL with the app id and the fixed locale as query parameters.
///
/// Falls back to plain string formatting when the base URL does not parse,
/// so the result is still usable as an identifier.
pub fn build_detail_url(config: &StoreConfig, app_id: &str) -> String {
    let params = [
        ("id", app_id),
        ("hl", config.language.as_str()),
        ("gl", config.region.as_str()),
    ];

    match Url::parse_with_params(&config.base_url, &params) {
        Ok(url) => url.to_string(),
        Err(err) => {
            log::warn!("base_url={} invalid: {err}", config.base_url);
            format!(
                "{}?id={app_id}&hl={}&gl={}",
                config.base_url, config.language, config.region
            )
        }
    }
}

impl PageFetcher for StoreFetcher {
    fn detail_url(&self, app_id: &str) -> String {
        build_detail_url(&self.config, app_id)
    }

    fn fetch(&self, app_id: &str) -> Result<Markup, FetchError> {
        let url = self.detail_url(app_id);

        log::debug!("app_id={app_id}: requesting {url}");

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT_LANGUAGE, &self.config.accept_language)
            .send()
            .map_err(|err| {
                log::error!("app_id={app_id}: {err}: {:#?}", get_error(&err));
                FetchError::Transport(get_error(&err))
            })?;

        let status = resp.status();
        if !status.is_success() {
            log::warn!("app_id={app_id}: origin returned {status}");
            return Err(FetchError::Status(status.as_u16()));
        }

        let html = resp.text().map_err(|err| {
            log::error!("app_id={app_id}: reading body: {err}");
            FetchError::Transport(get_error(&err))
        })?;

        log::debug!("app_id={app_id}: fetched {} bytes", html.len());
        Ok(Markup(html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_url_default_locale() {
        let config = StoreConfig::default();
        assert_eq!(
            build_detail_url(&config, "com.example.app"),
            "https://play.google.com/store/apps/details?id=com.example.app&hl=ar&gl=EG"
        );
    }

    #[test]
    fn test_detail_url_encodes_id() {
        let config = StoreConfig {
            language: "en".into(),
            region: "US".into(),
            ..Default::default()
        };
        assert_eq!(
            build_detail_url(&config, "a b&c"),
            "https://play.google.com/store/apps/details?id=a+b%26c&hl=en&gl=US"
        );
    }

    #[test]
    fn test_detail_url_invalid_base() {
        let config = StoreConfig {
            base_url: "not a url".into(),
            ..Default::default()
        };
        assert_eq!(build_detail_url(&config, "x"), "not a url?id=x&hl=ar&gl=EG");
    }

    #[test]
    fn test_fetcher_builds() {
        let fetcher = StoreFetcher::new(StoreConfig::default()).unwrap();
        assert!(fetcher.detail_url("x").contains("id=x"));
    }
}
