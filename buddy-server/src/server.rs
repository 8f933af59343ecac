use std::{convert::Infallible, net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;
use async_stream::stream;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use buddy_auth::{NewUser, ProfileUpdate};
use buddy_rag::{Document, DocumentKind, PreparedStream, RagError, load_document};
use buddy_search::render_markdown;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::{
    config::ServerConfig,
    error::ApiError,
    state::AppState,
    upload::{UploadKind, save_upload},
};

/// Largest accepted request body.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

type ApiResult<T> = Result<T, ApiError>;

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/api/profile/{user_id}", get(get_profile))
        .route("/api/profile", post(update_profile))
        .route("/api/update-password", post(update_password))
        .route("/upload-pdf-sum", post(upload_summary))
        .route("/upload-pdf-report", post(upload_report))
        .route("/upload-pdf-report/stream", post(stream_report))
        .route("/upload-pdf-qa", post(upload_question_document))
        .route("/check-documents", get(check_documents))
        .route("/api/questions/ask", post(ask_question))
        .route("/recommend-papers", post(recommend_papers))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config).await?;
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for research-buddy server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("research-buddy listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"research-buddy"}))
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

async fn signup(State(state): State<AppState>, Json(new_user): Json<NewUser>) -> ApiResult<impl IntoResponse> {
    let user_id = state.users.create_user(new_user).await?;
    info!(%user_id, "user created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "User created successfully",
            "user_id": user_id,
        })),
    ))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    identifier: String,
    #[serde(default)]
    password: String,
}

async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> ApiResult<Json<Value>> {
    if request.identifier.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Missing identifier or password"));
    }
    let user = state.users.verify_user(request.identifier.trim(), &request.password).await?;
    Ok(Json(json!({"status": "success", "message": "Login successful", "user": user})))
}

async fn get_profile(State(state): State<AppState>, Path(user_id): Path<String>) -> ApiResult<Json<Value>> {
    let user = state.users.get_user(&user_id).await?;
    Ok(Json(json!({"status": "success", "user": user})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRequest {
    #[serde(default)]
    user_id: String,
    #[serde(flatten)]
    update: ProfileUpdate,
}

async fn update_profile(
    State(state): State<AppState>,
    Json(request): Json<ProfileRequest>,
) -> ApiResult<Json<Value>> {
    if request.user_id.is_empty() {
        return Err(ApiError::bad_request("Missing user id"));
    }
    let user = state.users.update_profile(&request.user_id, request.update).await?;
    Ok(Json(json!({"status": "success", "message": "Profile updated", "user": user})))
}

#[derive(Debug, Default, Deserialize)]
struct UserRef {
    email: Option<String>,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest {
    #[serde(default)]
    current_password: String,
    #[serde(default)]
    new_password: String,
    #[serde(default)]
    user: UserRef,
}

async fn update_password(
    State(state): State<AppState>,
    Json(request): Json<PasswordRequest>,
) -> ApiResult<Json<Value>> {
    let identifier = request
        .user
        .email
        .into_iter()
        .chain(request.user.username)
        .find(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing user identifier"))?;
    if request.current_password.is_empty() || request.new_password.is_empty() {
        return Err(ApiError::bad_request("Missing required fields"));
    }

    let user = state
        .users
        .update_password(&identifier, &request.current_password, &request.new_password)
        .await?;
    Ok(Json(json!({"status": "success", "message": "Password updated successfully", "user": user})))
}

// ---------------------------------------------------------------------------
// Document uploads
// ---------------------------------------------------------------------------

struct UploadForm {
    file_name: String,
    bytes: Bytes,
    model: Option<String>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError { error: Some(err.to_string()), ..ApiError::new(err.status(), "Invalid multipart body") }
}

async fn read_upload(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut file = None;
    let mut model = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, bytes));
            }
            "model" => {
                let text = field.text().await.map_err(multipart_error)?;
                model = Some(text.trim().to_string()).filter(|m| !m.is_empty());
            }
            _ => {}
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| ApiError::bad_request("No file part"))?;
    if file_name.is_empty() {
        return Err(ApiError::bad_request("No selected file"));
    }
    Ok(UploadForm { file_name, bytes, model })
}

/// A saved and extracted upload.
struct StagedUpload {
    filename: String,
    path: PathBuf,
    document: Document,
}

async fn stage_upload(state: &AppState, kind: UploadKind, form: &UploadForm) -> ApiResult<StagedUpload> {
    let doc_kind = DocumentKind::from_path(&form.file_name)
        .map_err(|e| ApiError::from_rag("Unsupported file format", e))?;
    let (filename, path) = save_upload(&state.upload_dir, kind, &form.file_name, doc_kind.extension(), &form.bytes)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to save upload");
            ApiError::internal("Failed to save file", format!("{e:#}"))
        })?;
    let document = load_document(path.clone())
        .await
        .map_err(|e| ApiError::from_rag("Error reading file", e))?;
    info!(%filename, document.id = %document.id, pages = document.pages.len(), "upload staged");
    Ok(StagedUpload { filename, path, document })
}

async fn upload_summary(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Json<Value>> {
    let form = read_upload(multipart).await?;
    let staged = stage_upload(&state, UploadKind::Summary, &form).await?;

    match state.pipeline.summarize(&staged.document, form.model.as_deref()).await {
        Ok(generation) => Ok(Json(json!({
            "status": "success",
            "message": "File uploaded and summarized",
            "filename": staged.filename,
            "path": staged.path.display().to_string(),
            "summary": generation.text,
            "model": generation.model,
        }))),
        Err(err @ RagError::EmptyDocument(_)) => Err(ApiError::from_rag("Error summarizing file", err)),
        Err(err) => {
            warn!(error = %err, filename = %staged.filename, "summarization failed");
            Ok(Json(json!({
                "status": "success",
                "message": "File uploaded but error occurred during summarization",
                "filename": staged.filename,
                "path": staged.path.display().to_string(),
                "error": err.to_string(),
            })))
        }
    }
}

async fn upload_report(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Json<Value>> {
    let form = read_upload(multipart).await?;
    let staged = stage_upload(&state, UploadKind::Report, &form).await?;

    match state.pipeline.report(&staged.document, form.model.as_deref()).await {
        Ok(generation) => Ok(Json(json!({
            "status": "success",
            "message": "File uploaded and report generated",
            "filename": staged.filename,
            "path": staged.path.display().to_string(),
            "report": generation.text,
            "model": generation.model,
        }))),
        Err(err @ RagError::EmptyDocument(_)) => Err(ApiError::from_rag("Error generating report", err)),
        Err(err) => {
            warn!(error = %err, filename = %staged.filename, "report generation failed");
            Ok(Json(json!({
                "status": "success",
                "message": "File uploaded but error occurred during report generation",
                "filename": staged.filename,
                "path": staged.path.display().to_string(),
                "error": err.to_string(),
            })))
        }
    }
}

async fn stream_report(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    let form = read_upload(multipart).await?;
    let staged = stage_upload(&state, UploadKind::Report, &form).await?;
    let PreparedStream { model, chunk_count, mut fragments } = state
        .pipeline
        .report_stream(&staged.document, form.model.as_deref())
        .await
        .map_err(|e| ApiError::from_rag("Error generating report", e))?;
    let filename = staged.filename;

    let stream = stream! {
        let mut report = String::new();
        let mut failed = false;
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) => {
                    report.push_str(&text);
                    yield Ok(Event::default().event("fragment").data(json!({"text": text}).to_string()));
                }
                Err(err) => {
                    warn!(error = %err, %filename, "report stream failed");
                    let payload = json!({"message": "Error generating report", "error": err.to_string()});
                    yield Ok(Event::default().event("error").data(payload.to_string()));
                    failed = true;
                    break;
                }
            }
        }
        if !failed {
            info!(%filename, %model, report_len = report.len(), "report stream complete");
            let done = json!({
                "filename": filename,
                "model": model,
                "chunk_count": chunk_count,
                "report": report,
            });
            yield Ok(Event::default().event("done").data(done.to_string()));
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keepalive")))
}

async fn upload_question_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let form = read_upload(multipart).await?;
    let staged = stage_upload(&state, UploadKind::Question, &form).await?;
    let chunks = state
        .pipeline
        .ingest(&staged.document)
        .await
        .map_err(|e| ApiError::from_rag("Error processing document", e))?;

    Ok(Json(json!({
        "status": "success",
        "message": "File uploaded and processed",
        "filename": staged.filename,
        "path": staged.path.display().to_string(),
        "chunk_count": chunks.len(),
    })))
}

// ---------------------------------------------------------------------------
// Questions and papers
// ---------------------------------------------------------------------------

async fn check_documents(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let has_documents = state
        .pipeline
        .has_documents()
        .await
        .map_err(|e| ApiError::from_rag("Error checking documents", e))?;
    Ok(Json(json!({"status": "success", "has_documents": has_documents})))
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: String,
    model: Option<String>,
}

async fn ask_question(State(state): State<AppState>, Json(request): Json<AskRequest>) -> ApiResult<Json<Value>> {
    if request.question.trim().is_empty() {
        return Err(ApiError::bad_request("No question provided"));
    }
    let answer = state
        .pipeline
        .answer(&request.question, request.model.as_deref())
        .await
        .map_err(|e| ApiError::from_rag("Error answering question", e))?;

    let sources: Vec<Value> = answer
        .sources
        .iter()
        .map(|result| {
            json!({
                "source": result.chunk.source,
                "page": result.chunk.page,
                "score": result.score,
                "text": result.chunk.text,
            })
        })
        .collect();
    Ok(Json(json!({
        "status": "success",
        "answer": answer.text,
        "model": answer.model,
        "sources": sources,
    })))
}

#[derive(Debug, Deserialize)]
struct RecommendRequest {
    #[serde(default)]
    topic: String,
}

async fn recommend_papers(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> ApiResult<Json<Value>> {
    let topic = request.topic.trim();
    if topic.is_empty() {
        return Err(ApiError::bad_request("No topic provided"));
    }
    let hits = state.search.search(topic).await.map_err(|e| {
        error!(error = %e, topic, "paper search failed");
        ApiError::internal("Error processing recommendation", e)
    })?;
    Ok(Json(json!({
        "status": "success",
        "markdown": render_markdown(topic, &hits),
        "raw_results": hits,
    })))
}
