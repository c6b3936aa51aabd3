use crate::{catalog::CatalogEntry, metadata::RatingSource};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path};

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
const DEFAULT_STORE_URL: &str = "https://play.google.com/store/apps/details";
/// Markup patterns are tuned against this locale
const DEFAULT_LANGUAGE: &str = "ar";
const DEFAULT_REGION: &str = "EG";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_ACCEPT_LANGUAGE: &str = "ar,en-US;q=0.9,en;q=0.8";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;

/// Outbound request settings for the store detail page
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub base_url: String,

    /// `hl` query parameter
    #[serde(default = "default_language")]
    pub language: String,

    /// `gl` query parameter
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Should agree with `language`
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_store_url(),
            language: default_language(),
            region: default_region(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn default_store_url() -> String {
    DEFAULT_STORE_URL.to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept_language() -> String {
    DEFAULT_ACCEPT_LANGUAGE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Priority order of rating strategies, first match wins
    #[serde(default = "default_rating_order")]
    pub rating_order: Vec<RatingSource>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            rating_order: default_rating_order(),
        }
    }
}

fn default_rating_order() -> Vec<RatingSource> {
    RatingSource::DEFAULT_ORDER.to_vec()
}

/// In-memory response cache of the HTTP service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            store: StoreConfig::default(),
            extract: ExtractConfig::default(),
            cache: CacheConfig::default(),
            catalog: Vec::new(),
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let store = &self.store;
        if store.language.trim().is_empty() || store.region.trim().is_empty() {
            bail!("store.language and store.region must not be empty");
        }
        if store.user_agent.trim().is_empty() {
            bail!("store.user_agent must not be empty");
        }
        if store.timeout_secs == 0 {
            bail!("store.timeout_secs must be greater than 0");
        }

        let order = &self.extract.rating_order;
        if order.is_empty() {
            bail!("extract.rating_order must list at least one strategy");
        }
        let unique: HashSet<_> = order.iter().collect();
        if unique.len() != order.len() {
            bail!("extract.rating_order contains duplicates: {order:?}");
        }

        let mut ids = HashSet::new();
        for (idx, entry) in self.catalog.iter().enumerate() {
            if entry.id.trim().is_empty() {
                bail!("catalog entry #{} has an empty id", idx + 1);
            }
            if !ids.insert(entry.id.as_str()) {
                bail!("catalog entry #{} duplicates id {}", idx + 1, entry.id);
            }
        }

        Ok(())
    }

    /// Load config from `path`, writing the defaults there first if it does not exist.
    pub fn load_with(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("config {} not found, writing defaults", path.display());
            std::fs::write(path, serde_yml::to_string(&Self::default())?)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }

        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_yml::from_str(&config_str)
            .with_context(|| format!("config {} is malformed", path.display()))?;

        config.validate()?;

        Ok(config)
    }
}
