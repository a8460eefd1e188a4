use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_assistant_core::{
    AssistantConfig, AssistantError, ErrorKind, StudyAssistant, UploadedFile,
    DEFAULT_SUMMARY_DETAIL,
};
use tower_http::cors::{AllowHeaders, CorsLayer};
use tracing::{error, info};

const ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost",
    "http://localhost:3000",
    "http://127.0.0.1:3000",
];

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    assistant: Arc<StudyAssistant>,
}

#[derive(Deserialize)]
struct SummarizeRequest {
    text: String,
    #[serde(default = "default_detail")]
    detail: String,
}

fn default_detail() -> String {
    DEFAULT_SUMMARY_DETAIL.to_string()
}

#[derive(Serialize)]
struct SummarizeResponse {
    summary: String,
}

#[derive(Deserialize)]
struct ChatRequest {
    question: String,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
}

#[derive(Deserialize)]
struct TextInput {
    title: String,
    content: String,
}

#[derive(Serialize)]
struct LoadResponse {
    message: String,
    chunks_loaded: usize,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<AssistantError> for ApiError {
    fn from(error: AssistantError) -> Self {
        let status = match error.kind() {
            ErrorKind::Input => StatusCode::BAD_REQUEST,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status != StatusCode::BAD_REQUEST {
            error!(%error, "request failed");
        }
        Self {
            status,
            detail: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

pub fn router(assistant: Arc<StudyAssistant>) -> Router {
    let origins = ALLOWED_ORIGINS
        .into_iter()
        .map(HeaderValue::from_static)
        .collect::<Vec<_>>();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        .route("/", get(handle_root))
        .route("/config", get(handle_get_config).post(handle_update_config))
        .route("/summarize", post(handle_summarize))
        .route("/chat", post(handle_chat))
        .route("/upload_and_process", post(handle_upload))
        .route("/submit_text", post(handle_submit_text))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(AppState { assistant })
}

pub async fn run_server(assistant: Arc<StudyAssistant>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(bind = %bind, "study assistant api listening");
    axum::serve(listener, router(assistant)).await?;
    Ok(())
}

async fn handle_root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to the AI Study Assistant API.".to_string(),
    })
}

async fn handle_get_config(State(state): State<AppState>) -> Json<AssistantConfig> {
    Json(state.assistant.config().as_ref().clone())
}

async fn handle_update_config(
    State(state): State<AppState>,
    Json(config): Json<AssistantConfig>,
) -> Result<Json<AssistantConfig>, ApiError> {
    let updated = state.assistant.update_config(config)?;
    Ok(Json(updated.as_ref().clone()))
}

async fn handle_summarize(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let summary = state
        .assistant
        .summarize(&request.text, &request.detail)
        .await?;
    Ok(Json(SummarizeResponse { summary }))
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let answer = state.assistant.answer(&request.question).await?;
    Ok(Json(ChatResponse { answer }))
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<LoadResponse>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError::bad_request(error.to_string()))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let name = field.file_name().unwrap_or("unknown").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|error| ApiError::bad_request(error.to_string()))?;
        files.push(UploadedFile::new(name, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(ApiError::bad_request("No files were uploaded."));
    }

    let report = state.assistant.ingest_uploads(&files).await?;
    Ok(Json(LoadResponse {
        message: report.message(),
        chunks_loaded: report.chunks_added,
    }))
}

async fn handle_submit_text(
    State(state): State<AppState>,
    Json(input): Json<TextInput>,
) -> Result<Json<LoadResponse>, ApiError> {
    let chunks_loaded = state
        .assistant
        .ingest_document(&input.title, &input.content)
        .await?;
    Ok(Json(LoadResponse {
        message: format!(
            "Successfully processed and added text '{}' to the database.",
            input.title
        ),
        chunks_loaded,
    }))
}
