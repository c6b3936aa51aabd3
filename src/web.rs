use crate::{
    cache::MetadataCache,
    catalog::{Catalog, CatalogEntry},
    config::Config,
    metadata::{AppMetadata, DegradeReason, MetadataError, MetadataOutcome, MetadataService},
};
use anyhow::Context;
use axum::{
    extract::{Query, RawQuery, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::signal;
use tower_http::set_header::SetResponseHeaderLayer;

const CORS_ALLOW_METHODS: &str = "GET,OPTIONS,PATCH,DELETE,POST,PUT";
const CORS_ALLOW_HEADERS: &str = "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, Content-Length, Content-MD5, Content-Type, Date, X-Api-Version";

#[derive(Clone)]
pub struct SharedState {
    pub service: Arc<MetadataService>,
    pub cache: Arc<MetadataCache>,
    pub catalog: Arc<Catalog>,
}

impl SharedState {
    pub fn new(service: MetadataService, cache: MetadataCache, catalog: Catalog) -> Self {
        Self {
            service: Arc::new(service),
            cache: Arc::new(cache),
            catalog: Arc::new(catalog),
        }
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/app", any(app_metadata).options(preflight))
        .route("/api/catalog", get(catalog).options(preflight))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

async fn start_app(state: SharedState, listen: &str) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    log::info!("listening on {listen}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;

    Ok(())
}

pub fn start_daemon(config: &Config) -> anyhow::Result<()> {
    let service = MetadataService::from_config(config)?;
    let cache = if config.cache.enabled {
        MetadataCache::new(Duration::from_secs(config.cache.ttl_secs), true)
    } else {
        log::info!("metadata cache disabled");
        MetadataCache::disabled()
    };
    let catalog = Catalog::new(config.catalog.clone());
    let state = SharedState::new(service, cache, catalog);

    // The blocking http client inside the service must be dropped outside
    // the runtime, so this clone outlives it.
    let _service = state.service.clone();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(start_app(state, &config.listen));
    drop(runtime);

    result
}

#[derive(Debug)]
struct HttpError(MetadataError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            MetadataError::MissingAppId => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": self.0.to_string()})),
            ),
        }
        .into_response()
    }
}

impl From<MetadataError> for HttpError {
    fn from(err: MetadataError) -> Self {
        Self(err)
    }
}

/// Value of the first `id` parameter, `None` when absent or blank.
///
/// Parsed by hand so repeated or malformed parameters never turn into an
/// extractor rejection.
fn app_id_param(query: Option<&str>) -> Option<String> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.trim().is_empty())
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Metadata for one app, whatever the method. Every outcome except a missing
/// id is a 200.
async fn app_metadata(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> Result<Json<AppMetadata>, HttpError> {
    let Some(app_id) = app_id_param(query.as_deref()) else {
        return Err(MetadataError::MissingAppId.into());
    };

    if let Some(cached) = state.cache.get(&app_id) {
        log::debug!("app_id={app_id} outcome=cached");
        return Ok(Json(cached));
    }

    let service = state.service.clone();
    let id = app_id.clone();
    let outcome = match tokio::task::spawn_blocking(move || service.get_app_metadata(&id)).await {
        Ok(result) => result?,
        Err(err) => {
            log::error!("app_id={app_id} outcome=degraded err=task failed: {err}");
            MetadataOutcome::Degraded {
                metadata: AppMetadata::degraded(&app_id, &state.service.detail_url(&app_id)),
                reason: DegradeReason::Processing(err.to_string()),
            }
        }
    };

    if let MetadataOutcome::Fresh(metadata) = &outcome {
        state.cache.insert(metadata.clone());
        log::debug!("cache entries={}", state.cache.len());
    }

    Ok(Json(outcome.into_metadata()))
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
    /// Free-text search over title, description and category
    pub q: Option<String>,
}

async fn catalog(
    State(state): State<SharedState>,
    Query(query): Query<CatalogQuery>,
) -> Json<Vec<CatalogEntry>> {
    let mut entries: Vec<&CatalogEntry> = match query.q.as_deref() {
        Some(q) if !q.trim().is_empty() => state.catalog.search(q),
        _ => state.catalog.entries().iter().collect(),
    };

    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        entries.retain(|entry| entry.in_category(category));
    }

    Json(entries.into_iter().cloned().collect())
}
