//! Integration tests for the HTTP and WebSocket endpoints
//!
//! The router is driven through `tower::ServiceExt::oneshot` for plain
//! requests and through a bound listener plus `tokio-tungstenite` for the
//! streaming endpoint.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use feedhub_core::{refresh_once, CacheStore, Config, FeedDocument, FeedFetcher, FetchError};
use futures::StreamExt;
use http_body_util::BodyExt;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tower::ServiceExt;

use crate::server::{build_app, AppState};
use crate::session::HEARTBEAT_PAYLOAD;

fn doc(title: &str) -> FeedDocument {
    FeedDocument {
        title: title.to_owned(),
        ..Default::default()
    }
}

#[derive(Default)]
struct QueuedFetcher {
    queue: Mutex<HashMap<String, VecDeque<Result<FeedDocument, FetchError>>>>,
}

impl QueuedFetcher {
    fn push(&self, url: &str, result: Result<FeedDocument, FetchError>) {
        self.queue
            .lock()
            .unwrap()
            .entry(url.to_owned())
            .or_default()
            .push_back(result);
    }
}

#[async_trait]
impl FeedFetcher for QueuedFetcher {
    async fn fetch(&self, url: &str) -> Result<FeedDocument, FetchError> {
        self.queue
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Err(FetchError::Status(StatusCode::NOT_FOUND)))
    }
}

fn state_with(config: Config) -> AppState {
    AppState {
        store: CacheStore::in_memory(),
        config: Arc::new(config),
    }
}

async fn cache(store: &CacheStore, url: &str, feed: &FeedDocument) {
    store
        .put(url, serde_json::to_string(feed).unwrap())
        .await
        .unwrap();
}

async fn get_feeds(state: &AppState) -> (StatusCode, String, Vec<FeedDocument>) {
    let response = build_app(state.clone())
        .oneshot(Request::builder().uri("/feeds").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_owned())
        .unwrap_or_default();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_feeds_empty_cache() {
    let state = state_with(Config::new(vec!["http://a".into()], 1, 0));
    let (status, content_type, feeds) = get_feeds(&state).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "application/json");
    assert!(feeds.is_empty());
}

#[tokio::test]
async fn test_feeds_follow_source_order() {
    let sources = vec!["http://a".to_string(), "http://b".into(), "http://c".into()];
    let state = state_with(Config::new(sources, 1, 0));
    cache(&state.store, "http://c", &doc("C")).await;
    cache(&state.store, "http://a", &doc("A")).await;

    let (_, _, feeds) = get_feeds(&state).await;
    assert_eq!(feeds, vec![doc("A"), doc("C")]);
}

#[tokio::test]
async fn test_feeds_keep_stale_entry_until_next_success() {
    let sources = vec!["http://a".to_string()];
    let state = state_with(Config::new(sources.clone(), 1, 0));
    let fetcher = QueuedFetcher::default();
    fetcher.push("http://a", Ok(doc("D1")));
    fetcher.push(
        "http://a",
        Err(FetchError::Status(StatusCode::BAD_GATEWAY)),
    );
    fetcher.push("http://a", Ok(doc("D2")));

    refresh_once(&sources, &fetcher, &state.store).await;
    assert_eq!(get_feeds(&state).await.2, vec![doc("D1")]);

    refresh_once(&sources, &fetcher, &state.store).await;
    assert_eq!(get_feeds(&state).await.2, vec![doc("D1")]);

    refresh_once(&sources, &fetcher, &state.store).await;
    assert_eq!(get_feeds(&state).await.2, vec![doc("D2")]);
}

#[tokio::test]
async fn test_feeds_only_successful_source() {
    let sources = vec!["http://first".to_string(), "http://second".into()];
    let state = state_with(Config::new(sources.clone(), 1, 0));
    let fetcher = QueuedFetcher::default();
    fetcher.push("http://second", Ok(doc("Second")));

    refresh_once(&sources, &fetcher, &state.store).await;
    refresh_once(&sources, &fetcher, &state.store).await;

    assert_eq!(get_feeds(&state).await.2, vec![doc("Second")]);
}

#[tokio::test]
async fn test_static_and_index() {
    let dir = tempfile::tempdir().unwrap();
    let static_dir = dir.path().join("static");
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(static_dir.join("app.js"), "console.log('hi');").unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>feeds</h1>").unwrap();

    let mut config = Config::new(vec![], 1, 0);
    config.static_dir = static_dir;
    config.index_file = dir.path().join("index.html");
    let app = build_app(state_with(config));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"<h1>feeds</h1>");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/static/app.js")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"console.log('hi');");
}

async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_app(state)).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_ws_single_pass_then_close() {
    let sources = vec!["http://a".to_string(), "http://b".into(), "http://c".into()];
    let state = state_with(Config::new(sources, 1, 0));
    cache(&state.store, "http://a", &doc("A")).await;
    cache(&state.store, "http://c", &doc("C")).await;
    let addr = spawn_server(state).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .unwrap();

    let mut titles = Vec::new();
    let read_all = async {
        while let Some(Ok(msg)) = ws.next().await {
            match msg {
                WsMessage::Text(text) => {
                    let feed: FeedDocument = serde_json::from_str(text.as_str()).unwrap();
                    titles.push(feed.title);
                }
                WsMessage::Close(_) => break,
                _ => {}
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read_all)
        .await
        .expect("server should close after one pass");

    assert_eq!(titles, vec!["A".to_string(), "C".to_string()]);
}

#[tokio::test]
async fn test_ws_push_enabled_sends_heartbeat_and_data() {
    let state = state_with(Config::new(vec!["http://a".into()], 1, 5));
    cache(&state.store, "http://a", &doc("A")).await;
    let addr = spawn_server(state).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .unwrap();

    let mut saw_heartbeat = false;
    let mut saw_data = false;
    let read_two = async {
        while !(saw_heartbeat && saw_data) {
            match ws.next().await {
                Some(Ok(WsMessage::Text(text))) if text.as_str() == HEARTBEAT_PAYLOAD => {
                    saw_heartbeat = true
                }
                Some(Ok(WsMessage::Text(text))) => {
                    let feed: FeedDocument = serde_json::from_str(text.as_str()).unwrap();
                    assert_eq!(feed.title, "A");
                    saw_data = true;
                }
                Some(Ok(_)) => {}
                other => panic!("stream ended early: {:?}", other),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read_two)
        .await
        .expect("expected a heartbeat and a data frame");
}
