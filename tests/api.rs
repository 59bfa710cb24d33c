//! HTTP API tests: routing, auth headers, and error status mapping.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::Value;
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use retell_sync::api::{router, AppContext};
use retell_sync::feed::FetchLimits;
use retell_sync::storage::{Database, NewPodcast};
use retell_sync::sync::{ImageStore, Syncer};

struct TestApp {
    app: axum::Router,
    db: Database,
    dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

async fn setup(name: &str, service_token: Option<&str>) -> TestApp {
    let dir = std::env::temp_dir().join(format!("retell_sync_api_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let db_path = dir.join("test.db");
    let _ = std::fs::remove_file(&db_path);

    let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
    let media_dir = dir.join("media");
    let images = Arc::new(ImageStore::new(&media_dir, "http://localhost:8787/media").unwrap());
    // Mock feed hosts bind to loopback, which the default URL policy rejects
    let limits = FetchLimits {
        allow_private_hosts: true,
        ..FetchLimits::default()
    };
    let syncer = Syncer::new(db.clone(), reqwest::Client::new(), images, limits);

    let ctx = AppContext {
        syncer,
        service_token: service_token.map(|t| Arc::new(SecretString::from(t.to_string()))),
    };

    TestApp {
        app: router(ctx, &media_dir),
        db,
        dir,
    }
}

fn request(method_str: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method_str)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn request_as(method_str: &str, uri: &str, author_id: &str) -> Request<Body> {
    Request::builder()
        .method(method_str)
        .uri(uri)
        .header("x-author-id", author_id)
        .body(Body::empty())
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

const MINIMAL_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Owned Show</title>
    <item>
        <title>Episode 1</title>
        <enclosure url="https://cdn.example/1.mp3" type="audio/mpeg"/>
    </item>
</channel></rss>"#;

async fn insert_feed_podcast(db: &Database, author_id: &str, rss_url: &str) -> i64 {
    db.insert_podcast(&NewPodcast {
        author_id: author_id.to_string(),
        title: "Owned Show".to_string(),
        rss_url: Some(rss_url.to_string()),
        ..NewPodcast::default()
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn health_requires_no_auth() {
    let test = setup("health", None).await;

    let response = test.app.clone().oneshot(request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "retell-sync");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn sync_without_author_header_is_401() {
    let test = setup("no_header", None).await;

    let response = test
        .app
        .clone()
        .oneshot(request("POST", "/podcasts/1/sync"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sync_of_unknown_podcast_is_404() {
    let test = setup("unknown", None).await;

    let response = test
        .app
        .clone()
        .oneshot(request_as("POST", "/podcasts/999/sync", "author-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sync_of_someone_elses_podcast_is_403() {
    let test = setup("not_owner", None).await;
    let id = insert_feed_podcast(&test.db, "author-1", "https://feeds.example/x").await;

    let response = test
        .app
        .clone()
        .oneshot(request_as(
            "POST",
            &format!("/podcasts/{}/sync", id),
            "author-2",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn owner_sync_returns_outcome() {
    let test = setup("owner_sync", None).await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MINIMAL_RSS))
        .mount(&server)
        .await;

    let id = insert_feed_podcast(&test.db, "author-1", &format!("{}/feed", server.uri())).await;

    let response = test
        .app
        .clone()
        .oneshot(request_as(
            "POST",
            &format!("/podcasts/{}/sync", id),
            "author-1",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["podcast_id"], id);
    assert_eq!(body["new_episodes"], 1);
}

#[tokio::test]
async fn unreachable_feed_maps_to_502() {
    let test = setup("bad_gateway", None).await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let id = insert_feed_podcast(&test.db, "author-1", &format!("{}/feed", server.uri())).await;

    let response = test
        .app
        .clone()
        .oneshot(request_as(
            "POST",
            &format!("/podcasts/{}/sync", id),
            "author-1",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("feed unavailable"));
}

#[tokio::test]
async fn author_feeds_sync_returns_reports() {
    let test = setup("author_feeds", None).await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MINIMAL_RSS))
        .mount(&server)
        .await;

    insert_feed_podcast(&test.db, "author-1", &format!("{}/feed", server.uri())).await;

    let response = test
        .app
        .clone()
        .oneshot(request_as("POST", "/sync/feeds", "author-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let reports = body.as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["new_episodes"], 1);
}

#[tokio::test]
async fn platform_sync_without_configured_token_is_403() {
    let test = setup("no_token", None).await;

    let req = Request::builder()
        .method("POST")
        .uri("/internal/sync-all")
        .header("Authorization", "Bearer anything")
        .body(Body::empty())
        .unwrap();
    let response = test.app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn platform_sync_with_wrong_token_is_401() {
    let test = setup("wrong_token", Some("correct-token")).await;

    let req = Request::builder()
        .method("POST")
        .uri("/internal/sync-all")
        .header("Authorization", "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let response = test.app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn platform_sync_with_valid_token_returns_summary() {
    let test = setup("valid_token", Some("correct-token")).await;

    let req = Request::builder()
        .method("POST")
        .uri("/internal/sync-all")
        .header("Authorization", "Bearer correct-token")
        .body(Body::empty())
        .unwrap();
    let response = test.app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["podcasts_processed"], 0);
    assert_eq!(body["errors"], 0);
}
