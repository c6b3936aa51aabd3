use serde::{Deserialize, Serialize};

/// Failure to retrieve a detail page from the store.
///
/// Both variants are expected outcomes: the store answers unreliably, so
/// callers degrade instead of escalating.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The store answered with a non-success status (not found, blocked, rate limited)
    #[error("origin responded with status {0}")]
    Status(u16),

    /// DNS, connect, timeout or body read failure
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors surfaced to the caller of the metadata service.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    #[error("App ID is required")]
    MissingAppId,
}

/// Raw HTML of a fetched detail page
#[derive(Debug, Clone)]
pub struct Markup(pub String);

impl Markup {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Markup {
    fn from(html: String) -> Self {
        Self(html)
    }
}

impl From<&str> for Markup {
    fn from(html: &str) -> Self {
        Self(html.to_string())
    }
}

/// Metadata scraped for a single app.
///
/// Every field except `id` and `source_url` is best-effort and falls back to
/// its empty value when nothing matched.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppMetadata {
    pub id: String,
    pub icon_url: String,
    /// 0 means unknown, not zero stars
    pub rating: f64,
    pub downloads: String,
    pub description: String,
    pub full_description: String,
    pub screenshots: Vec<String>,
    pub reviews_count: String,
    pub updated_on: String,
    pub version: String,
    pub source_url: String,
}

impl AppMetadata {
    /// Record with only the identity fields populated
    pub fn degraded(id: &str, source_url: &str) -> Self {
        Self {
            id: id.to_string(),
            source_url: source_url.to_string(),
            ..Default::default()
        }
    }

    /// Returns true if any scraped field is present
    pub fn has_any_data(&self) -> bool {
        !self.icon_url.is_empty()
            || self.rating > 0.0
            || !self.downloads.is_empty()
            || !self.full_description.is_empty()
            || !self.screenshots.is_empty()
            || !self.reviews_count.is_empty()
            || !self.updated_on.is_empty()
            || !self.version.is_empty()
    }
}

/// Why a record carries only default values
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DegradeReason {
    OriginUnavailable(u16),
    Transport(String),
    Processing(String),
}

impl From<FetchError> for DegradeReason {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Status(status) => DegradeReason::OriginUnavailable(status),
            FetchError::Transport(msg) => DegradeReason::Transport(msg),
        }
    }
}

impl std::fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradeReason::OriginUnavailable(status) => write!(f, "origin unavailable ({status})"),
            DegradeReason::Transport(msg) => write!(f, "transport: {msg}"),
            DegradeReason::Processing(msg) => write!(f, "processing: {msg}"),
        }
    }
}

/// Result of a metadata request once fetch failures have been absorbed
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataOutcome {
    Fresh(AppMetadata),
    Degraded {
        metadata: AppMetadata,
        reason: DegradeReason,
    },
}

impl MetadataOutcome {
    pub fn metadata(&self) -> &AppMetadata {
        match self {
            MetadataOutcome::Fresh(metadata) => metadata,
            MetadataOutcome::Degraded { metadata, .. } => metadata,
        }
    }

    pub fn into_metadata(self) -> AppMetadata {
        match self {
            MetadataOutcome::Fresh(metadata) => metadata,
            MetadataOutcome::Degraded { metadata, .. } => metadata,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, MetadataOutcome::Degraded { .. })
    }

    pub fn degrade_reason(&self) -> Option<&DegradeReason> {
        match self {
            MetadataOutcome::Fresh(_) => None,
            MetadataOutcome::Degraded { reason, .. } => Some(reason),
        }
    }
}

/// Which strategy produced each field, for `--report` and debug logging
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExtractReport {
    pub field_decisions: Vec<FieldDecision>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecision {
    pub field: String,
    /// Strategy name, `None` when every strategy missed
    pub winner: Option<String>,
}

impl ExtractReport {
    #[allow(dead_code)]
    pub fn winner(&self, field: &str) -> Option<&str> {
        self.field_decisions
            .iter()
            .find(|d| d.field == field)
            .and_then(|d| d.winner.as_deref())
    }

    pub(crate) fn record(&mut self, field: &str, winner: Option<&str>) {
        self.field_decisions.push(FieldDecision {
            field: field.to_string(),
            winner: winner.map(str::to_string),
        });
    }
}
