use super::{detail_url, service_with, FixtureFetcher, PanickingFetcher, DETAILS_EN};
use crate::cache::MetadataCache;
use crate::catalog::{Catalog, CatalogEntry};
use crate::metadata::MetadataService;
use crate::web::{router, SharedState};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tower::ServiceExt;

const APP_ID: &str = "io.kodular.example.agpeya";

fn state(service: MetadataService) -> SharedState {
    SharedState::new(service, MetadataCache::disabled(), Catalog::default())
}

async fn send(state: SharedState, method: Method, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

async fn get_json(state: SharedState, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(state, Method::GET, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_missing_id_is_bad_request() {
    let (status, body) = get_json(state(service_with(FixtureFetcher::new())), "/api/app").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, serde_json::json!({"error": "App ID is required"}));
}

#[tokio::test]
async fn test_empty_id_is_bad_request() {
    let (status, body) =
        get_json(state(service_with(FixtureFetcher::new())), "/api/app?id=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "App ID is required");
}

#[tokio::test]
async fn test_repeated_id_uses_first() {
    let service = service_with(FixtureFetcher::new().page(APP_ID, DETAILS_EN));
    let (status, body) =
        get_json(state(service), &format!("/api/app?id={APP_ID}&id=com.other")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], APP_ID);
    assert_eq!(body["version"], "2025.1.4");
}

#[tokio::test]
async fn test_unrelated_params_ignored() {
    let (status, body) = get_json(
        state(service_with(FixtureFetcher::new())),
        "/api/app?lang=ar&id=com.missing&id",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "com.missing");
}

#[tokio::test]
async fn test_other_methods_served() {
    for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
        let service = service_with(FixtureFetcher::new().page(APP_ID, DETAILS_EN));
        let (status, headers, body) =
            send(state(service), method.clone(), &format!("/api/app?id={APP_ID}")).await;

        assert_eq!(status, StatusCode::OK, "{method}");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["id"], APP_ID);
    }

    let (status, _, body) = send(
        state(service_with(FixtureFetcher::new())),
        Method::POST,
        "/api/app",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "App ID is required");
}

#[tokio::test]
async fn test_preflight() {
    let (status, headers, body) = send(
        state(service_with(FixtureFetcher::new())),
        Method::OPTIONS,
        "/api/app",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_METHODS],
        "GET,OPTIONS,PATCH,DELETE,POST,PUT"
    );
    assert!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .contains("X-Api-Version"));
}

#[tokio::test]
async fn test_success() {
    let service = service_with(FixtureFetcher::new().page(APP_ID, DETAILS_EN));
    let (status, headers, body) =
        send(state(service), Method::GET, &format!("/api/app?id={APP_ID}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["id"], APP_ID);
    assert_eq!(body["sourceUrl"], detail_url(APP_ID));
    assert_eq!(body["rating"], 4.8);
    assert_eq!(body["downloads"], "100K+");
    assert_eq!(body["reviewsCount"], "1.84K");
    assert_eq!(body["updatedOn"], "Nov 3, 2024");
    assert_eq!(body["version"], "2025.1.4");
    assert_eq!(body["screenshots"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_origin_not_found_is_still_ok() {
    let (status, body) = get_json(
        state(service_with(FixtureFetcher::new())),
        "/api/app?id=com.missing",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "com.missing");
    assert_eq!(body["sourceUrl"], detail_url("com.missing"));
    assert_eq!(body["iconUrl"], "");
    assert_eq!(body["rating"], 0.0);
    assert_eq!(body["description"], "");
    assert_eq!(body["screenshots"], serde_json::json!([]));
}

#[tokio::test]
async fn test_processing_failure_is_still_ok() {
    let (status, body) =
        get_json(state(service_with(PanickingFetcher)), &format!("/api/app?id={APP_ID}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], APP_ID);
    assert_eq!(body["version"], "");
}

#[tokio::test]
async fn test_fresh_record_served_from_cache() {
    let fetcher = FixtureFetcher::new()
        .page(APP_ID, DETAILS_EN)
        .failure("com.missing", crate::metadata::FetchError::Status(404));
    let calls = fetcher.calls();
    let state = SharedState::new(
        service_with(fetcher),
        MetadataCache::new(Duration::from_secs(60), true),
        Catalog::default(),
    );

    let uri = format!("/api/app?id={APP_ID}");
    let (_, first) = get_json(state.clone(), &uri).await;
    let (_, second) = get_json(state.clone(), &uri).await;
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // degraded records are not cached
    get_json(state.clone(), "/api/app?id=com.missing").await;
    get_json(state.clone(), "/api/app?id=com.missing").await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(state.cache.len(), 1);
}

#[tokio::test]
async fn test_catalog_listing() {
    let hymns = CatalogEntry {
        title: "Coptic Hymns".into(),
        category: Some("Hymns".into()),
        featured: true,
        ..CatalogEntry::new("app.hymns")
    };
    let radio = CatalogEntry {
        title: "Coptic Radio".into(),
        description: "Live hymns and sermons".into(),
        category: Some("Radio".into()),
        ..CatalogEntry::new("app.radio")
    };
    let readings = CatalogEntry {
        title: "Katameros".into(),
        category: Some("Readings".into()),
        ..CatalogEntry::new("app.readings")
    };
    let state = SharedState::new(
        service_with(FixtureFetcher::new()),
        MetadataCache::disabled(),
        Catalog::new(vec![hymns, radio, readings]),
    );

    let ids = |value: &Value| -> Vec<String> {
        value
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e["id"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    };

    let (status, all) = get_json(state.clone(), "/api/catalog").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&all), vec!["app.hymns", "app.radio", "app.readings"]);

    let (_, filtered) = get_json(state.clone(), "/api/catalog?category=hymns").await;
    assert_eq!(ids(&filtered), vec!["app.hymns"]);
    assert_eq!(filtered[0]["featured"], true);

    let (_, found) = get_json(state.clone(), "/api/catalog?q=HYMNS").await;
    assert_eq!(ids(&found), vec!["app.hymns", "app.radio"]);

    let (_, narrowed) = get_json(state.clone(), "/api/catalog?q=coptic&category=radio").await;
    assert_eq!(ids(&narrowed), vec!["app.radio"]);

    let (_, none) = get_json(state, "/api/catalog?q=agpeya").await;
    assert_eq!(ids(&none), Vec::<String>::new());
}
