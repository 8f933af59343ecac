//! End-to-end HTTP tests against an in-process server with scripted
//! providers.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{Json, Router, routing::get};
use buddy_auth::UserStore;
use buddy_model::MockLlm;
use buddy_rag::{HashingEmbedder, InMemoryVectorStore, RagPipeline};
use buddy_search::{PaperSearch, SearchConfig};
use buddy_server::{AppState, app_router};
use reqwest::{
    StatusCode,
    multipart::{Form, Part},
};
use serde_json::{Value, json};

const NOTES: &str = "Photosynthesis in plants produces oxygen and glucose from sunlight.\n\n\
The Roman Empire expanded across the Mediterranean under Augustus.";

struct TestServer {
    base: String,
    llm: Arc<MockLlm>,
    upload_dir: PathBuf,
    _uploads: tempfile::TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });
    format!("http://{addr}")
}

async fn fake_search_api() -> String {
    let app = Router::new().route(
        "/customsearch/v1",
        get(|| async {
            Json(json!({
                "items": [{
                    "title": "Attention Is All You Need",
                    "link": "https://arxiv.org/abs/1706.03762",
                    "snippet": "The Transformer."
                }]
            }))
        }),
    );
    serve(app).await
}

async fn spawn_server(llm: MockLlm) -> TestServer {
    let llm = Arc::new(llm);
    let pipeline = RagPipeline::builder()
        .embedding_provider(Arc::new(HashingEmbedder::new(1024)))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .llm(llm.clone())
        .build()
        .expect("pipeline");
    let search = PaperSearch::new("test-key", "engine-id", SearchConfig::default())
        .expect("search client")
        .with_base_url(fake_search_api().await);
    let uploads = tempfile::tempdir().expect("upload dir");

    let state = AppState {
        pipeline: Arc::new(pipeline),
        users: UserStore::in_memory().await.expect("user store"),
        search: Arc::new(search),
        upload_dir: uploads.path().to_path_buf(),
    };
    let base = serve(app_router(state)).await;
    TestServer { base, llm, upload_dir: uploads.path().to_path_buf(), _uploads: uploads }
}

fn file_form(name: &str, contents: &str) -> Form {
    Form::new().part("file", Part::bytes(contents.as_bytes().to_vec()).file_name(name.to_string()))
}

async fn post_form(server: &TestServer, path: &str, form: Form) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(server.url(path))
        .multipart(form)
        .send()
        .await
        .expect("upload response");
    let status = response.status();
    (status, response.json().await.expect("json body"))
}

async fn post_json(server: &TestServer, path: &str, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(server.url(path))
        .json(&body)
        .send()
        .await
        .expect("json response");
    let status = response.status();
    (status, response.json().await.expect("json body"))
}

async fn get_json(server: &TestServer, path: &str) -> (StatusCode, Value) {
    let response = reqwest::get(server.url(path)).await.expect("get response");
    let status = response.status();
    (status, response.json().await.expect("json body"))
}

/// `(event, data)` pairs from a complete SSE body.
fn sse_events(body: &str) -> Vec<(String, Value)> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(name) = line.strip_prefix("event: ") {
                    event = Some(name.to_string());
                } else if let Some(payload) = line.strip_prefix("data: ") {
                    data = serde_json::from_str(payload).ok();
                }
            }
            Some((event?, data?))
        })
        .collect()
}

#[tokio::test]
async fn health_reports_service_name() {
    let server = spawn_server(MockLlm::new(["unused"])).await;
    let (status, body) = get_json(&server, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "service": "research-buddy"}));
}

#[tokio::test]
async fn account_lifecycle() {
    let server = spawn_server(MockLlm::new(["unused"])).await;
    let signup = json!({
        "username": "ada",
        "email": "ada@example.com",
        "password": "engine",
        "firstName": "Ada",
        "lastName": "Lovelace"
    });

    let (status, created) = post_json(&server, "/signup", signup.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["message"], "User created successfully");
    let user_id = created["user_id"].as_str().unwrap().to_string();

    let (status, duplicate) = post_json(&server, "/signup", signup).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate["message"], "Username already exists");

    let (status, missing) = post_json(&server, "/signup", json!({"username": "bob"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(missing["status"], "error");

    let (status, login) =
        post_json(&server, "/login", json!({"identifier": "ada@example.com", "password": "engine"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"]["firstName"], "Ada");
    assert_eq!(login["user"]["userId"], user_id.as_str());

    let (status, _) = post_json(&server, "/login", json!({"identifier": "ada", "password": "nope"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post_json(&server, "/login", json!({"identifier": "ada"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, profile) = post_json(
        &server,
        "/api/profile",
        json!({"userId": user_id, "profilePath": "uploads/ada.png"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["user"]["profilePath"], "uploads/ada.png");

    let (status, fetched) = get_json(&server, &format!("/api/profile/{user_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["user"]["lastName"], "Lovelace");

    let (status, _) = get_json(&server, "/api/profile/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, changed) = post_json(
        &server,
        "/api/update-password",
        json!({"currentPassword": "engine", "newPassword": "difference", "user": {"username": "ada"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(changed["status"], "success");

    let (status, _) =
        post_json(&server, "/login", json!({"identifier": "ada", "password": "difference"})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn summary_upload_saves_file_and_returns_markdown() {
    let server = spawn_server(MockLlm::new(["#Overview\n", "Plants and Rome."])).await;

    let form = file_form("my notes.txt", NOTES).text("model", "gemini-2.0-flash");
    let (status, body) = post_form(&server, "/upload-pdf-sum", form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "File uploaded and summarized");
    assert_eq!(body["summary"], "# Overview\nPlants and Rome.");
    assert_eq!(body["model"], "gemini-2.0-flash");

    let filename = body["filename"].as_str().unwrap();
    assert!(filename.ends_with("_my_notes.txt"));
    let saved = server.upload_dir.join("sum_uploads").join(filename);
    assert_eq!(std::fs::read_to_string(saved).unwrap(), NOTES);
}

#[tokio::test]
async fn failed_generation_still_reports_upload() {
    let server = spawn_server(MockLlm::failing("quota exceeded")).await;

    let (status, body) = post_form(&server, "/upload-pdf-report", file_form("notes.txt", NOTES)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "File uploaded but error occurred during report generation");
    assert!(body["error"].as_str().unwrap().contains("quota exceeded"));
    assert!(body.get("report").is_none());
}

#[tokio::test]
async fn bad_uploads_are_rejected() {
    let server = spawn_server(MockLlm::new(["unused"])).await;

    let (status, body) = post_form(&server, "/upload-pdf-sum", file_form("blank.txt", "  \n\n ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, body) = post_form(&server, "/upload-pdf-sum", file_form("figure.png", "png")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Unsupported file format"));

    let (status, body) = post_form(&server, "/upload-pdf-report", Form::new().text("model", "x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No file part");

    assert_eq!(server.llm.calls(), 0);
}

#[tokio::test]
async fn report_stream_emits_fragments_then_done() {
    let server = spawn_server(MockLlm::new(["## Report\n", "Findings."])).await;

    let response = reqwest::Client::new()
        .post(server.url("/upload-pdf-report/stream"))
        .multipart(file_form("notes.txt", NOTES))
        .send()
        .await
        .expect("stream response");
    assert_eq!(response.status(), StatusCode::OK);
    let events = sse_events(&response.text().await.expect("stream body"));

    let names: Vec<&str> = events.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["fragment", "fragment", "done"]);
    assert_eq!(events[0].1["text"], "## Report\n");
    assert_eq!(events[2].1["report"], "## Report\nFindings.");
    assert_eq!(events[2].1["model"], "gemini-2.0-flash");
}

#[tokio::test]
async fn report_stream_ends_with_error_event_on_failure() {
    let server = spawn_server(MockLlm::new(["partial"]).with_failure("connection reset")).await;

    let response = reqwest::Client::new()
        .post(server.url("/upload-pdf-report/stream"))
        .multipart(file_form("notes.txt", NOTES))
        .send()
        .await
        .expect("stream response");
    let events = sse_events(&response.text().await.expect("stream body"));

    let names: Vec<&str> = events.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["fragment", "error"]);
    assert!(events[1].1["error"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn questions_require_an_ingested_document() {
    let server = spawn_server(MockLlm::new(["Plants release oxygen."])).await;

    let (_, before) = get_json(&server, "/check-documents").await;
    assert_eq!(before, json!({"status": "success", "has_documents": false}));

    let (status, body) =
        post_json(&server, "/api/questions/ask", json!({"question": "What do plants produce?"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No documents have been processed yet. Please upload a document first.");
    assert_eq!(server.llm.calls(), 0);

    let (status, uploaded) = post_form(&server, "/upload-pdf-qa", file_form("notes.txt", NOTES)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(uploaded["chunk_count"].as_u64().unwrap() >= 1);
    assert!(server.upload_dir.join("qa_uploads").join(uploaded["filename"].as_str().unwrap()).exists());

    let (_, after) = get_json(&server, "/check-documents").await;
    assert_eq!(after["has_documents"], true);

    let (status, answer) =
        post_json(&server, "/api/questions/ask", json!({"question": "What do plants produce?"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answer["answer"], "Plants release oxygen.");
    assert_eq!(answer["model"], "Llama3-8b-8192");
    assert_eq!(answer["sources"][0]["source"], uploaded["filename"]);
    assert_eq!(server.llm.calls(), 1);

    let (status, blank) = post_json(&server, "/api/questions/ask", json!({"question": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(blank["message"], "No question provided");
}

#[tokio::test]
async fn recommend_papers_renders_markdown() {
    let server = spawn_server(MockLlm::new(["unused"])).await;

    let (status, body) = post_json(&server, "/recommend-papers", json!({"topic": "transformers"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert!(body["markdown"].as_str().unwrap().starts_with("## Research Papers on transformers\n\n"));
    assert_eq!(body["raw_results"][0]["title"], "Attention Is All You Need");

    let (status, body) = post_json(&server, "/recommend-papers", json!({"topic": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No topic provided");
}
