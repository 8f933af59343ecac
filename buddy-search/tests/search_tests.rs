//! Paper search against an in-process fake Custom Search API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use buddy_search::{Backend, PaperSearch, SearchConfig, SearchError, render_markdown};
use serde_json::json;

type Captured = Arc<Mutex<Option<HashMap<String, String>>>>;

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });
    format!("http://{addr}")
}

async fn two_hits(
    State(captured): State<Captured>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    *captured.lock().unwrap() = Some(params);
    Json(json!({
        "kind": "customsearch#search",
        "items": [
            {"title": "Attention Is All You Need", "link": "https://arxiv.org/abs/1706.03762", "snippet": "The Transformer."},
            {"title": "BERT", "link": "https://arxiv.org/abs/1810.04805"}
        ]
    }))
}

fn client(base: String, config: SearchConfig) -> PaperSearch {
    PaperSearch::new("test-key", "engine-id", config).unwrap().with_base_url(base)
}

#[tokio::test]
async fn search_maps_items_to_hits() {
    let captured = Captured::default();
    let app = Router::new()
        .route("/customsearch/v1", get(two_hits))
        .with_state(captured.clone());
    let base = spawn(app).await;

    let hits = client(base, SearchConfig::default()).search("transformers").await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].title, "Attention Is All You Need");
    assert_eq!(hits[0].link, "https://arxiv.org/abs/1706.03762");
    assert_eq!(hits[1].snippet, "");

    let params = captured.lock().unwrap().clone().unwrap();
    assert_eq!(params["q"], "Research Papers on Topic: transformers");
    assert_eq!(params["key"], "test-key");
    assert_eq!(params["cx"], "engine-id");
    assert_eq!(params["num"], "5");
    assert_eq!(params["gl"], "us");
    assert_eq!(params["hl"], "en");
    assert_eq!(params["safe"], "active");
    assert_eq!(params["dateRestrict"], "m1");

    let markdown = render_markdown("transformers", &hits);
    assert!(markdown.contains("### [BERT](https://arxiv.org/abs/1810.04805)\nNo Description\n\n"));
}

#[tokio::test]
async fn site_restricted_backend_uses_its_endpoint() {
    let captured = Captured::default();
    let app = Router::new()
        .route("/customsearch/v1/siterestrict", get(two_hits))
        .with_state(captured.clone());
    let base = spawn(app).await;
    let config = SearchConfig { backend: Backend::SiteRestricted, max_results: 10, ..Default::default() };

    let hits = client(base, config).search("rag").await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(captured.lock().unwrap().as_ref().unwrap()["num"], "10");
}

#[tokio::test]
async fn missing_items_yield_no_hits() {
    let app = Router::new().route(
        "/customsearch/v1",
        get(|| async { Json(json!({"kind": "customsearch#search", "searchInformation": {"totalResults": "0"}})) }),
    );
    let base = spawn(app).await;

    let hits = client(base, SearchConfig::default()).search("nothing").await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn quota_exhaustion_yields_no_hits() {
    let app = Router::new().route(
        "/customsearch/v1",
        get(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({"error": {"code": 429, "message": "Quota exceeded for quota metric 'Queries'"}})),
            )
        }),
    );
    let base = spawn(app).await;

    let hits = client(base, SearchConfig::default()).search("anything").await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn other_failures_are_errors() {
    let app = Router::new().route(
        "/customsearch/v1",
        get(|| async { (StatusCode::BAD_REQUEST, "Invalid Value") }),
    );
    let base = spawn(app).await;

    let err = client(base, SearchConfig::default()).search("anything").await.unwrap_err();
    match err {
        SearchError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid Value");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_api_is_a_request_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client(base, SearchConfig::default()).search("anything").await.unwrap_err();
    assert!(matches!(err, SearchError::Request(_)));
}
