//! JSON API handlers.
//!
//! Endpoints:
//!
//! - `POST   /api/chat/message`          Run one chat turn
//! - `POST   /api/chat/history`          Get a session's history
//! - `POST   /api/chat/clear`            Empty a session's history
//! - `DELETE /api/chat/session`          Delete a session
//! - `POST   /api/documents`             Ingest a plain-text document
//! - `DELETE /api/documents`             Remove an organization's documents
//! - `POST   /api/pdf/query`             Search an organization's documents
//! - `POST   /api/emotion-detection/`    Tag text with emotion labels
//! - `GET    /api/healthcheck`           Liveness probe
//!
//! Errors are returned as `{"detail": "..."}` with 400, 404, or 500; bodies
//! that do not deserialize keep the same shape with axum's rejection status.

use axum::{
    Router,
    extract::{FromRequest, Request, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use supportline_chat::orchestrator::{ChatRequest, require_non_blank, validate_retrieval_params};
use supportline_chat::{ChatResult, HistoryView, Turn};
use supportline_core::emotion::EmotionClassifier;
use supportline_core::error::{ChatError, RetrievalError};
use supportline_core::retrieval::{RetrievalQuery, Retriever};

use crate::SharedState;

// ── Router ────────────────────────────────────────────────────────────────

pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/chat/message", post(chat_message_handler))
        .route("/api/chat/history", post(chat_history_handler))
        .route("/api/chat/clear", post(chat_clear_handler))
        .route("/api/chat/session", delete(chat_delete_handler))
        .route(
            "/api/documents",
            post(ingest_document_handler).delete(purge_documents_handler),
        )
        .route("/api/pdf/query", post(query_documents_handler))
        .route("/api/emotion-detection/", post(emotion_detection_handler))
        .route("/api/healthcheck", get(healthcheck_handler))
        .with_state(state)
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
}

impl From<ChatError> for ErrorResponse {
    fn from(e: ChatError) -> Self {
        Self {
            detail: e.to_string(),
        }
    }
}

/// Map the chat error taxonomy onto HTTP status classes.
fn chat_error(e: ChatError) -> ApiError {
    let status = match &e {
        ChatError::Validation(_) => StatusCode::BAD_REQUEST,
        ChatError::NotFound(_) => StatusCode::NOT_FOUND,
        ChatError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %e, "Chat processing failed");
    }
    (status, Json(e.into()))
}

fn retrieval_error(e: RetrievalError) -> ApiError {
    match e {
        RetrievalError::InvalidQuery(_) | RetrievalError::InvalidDocument(_) => {
            api_error(StatusCode::BAD_REQUEST, e.to_string())
        }
        _ => {
            error!(error = %e, "Retrieval failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// `Json` extractor whose rejection keeps the `{"detail": ...}` error shape.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(api_error(rejection.status(), rejection.body_text())),
        }
    }
}

fn require(field_message: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, field_message));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    pub session_id: String,
    pub organization_id: String,
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub score_threshold: Option<f32>,
}

/// Provenance as the frontend consumes it.
#[derive(Debug, Serialize, Deserialize)]
pub struct SourceDto {
    pub pdf_filename: String,
    pub chunk_index: usize,
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub status: String,
    pub session_id: String,
    pub organization_id: String,
    pub query: String,
    pub response: String,
    pub sources: Vec<SourceDto>,
    pub conversation_length: usize,
    pub retrieved_documents: usize,
}

impl From<ChatResult> for ChatMessageResponse {
    fn from(r: ChatResult) -> Self {
        Self {
            status: r.status,
            session_id: r.session_id,
            organization_id: r.organization_id,
            query: r.query,
            response: r.response,
            sources: r
                .sources
                .into_iter()
                .map(|p| SourceDto {
                    pdf_filename: p.source_id,
                    chunk_index: p.position_index,
                    score: p.score,
                })
                .collect(),
            conversation_length: r.conversation_length,
            retrieved_documents: r.retrieved_documents,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub status: String,
    pub session_id: String,
    pub organization_id: String,
    pub messages: Vec<Turn>,
    pub total_messages: usize,
}

impl From<HistoryView> for HistoryResponse {
    fn from(v: HistoryView) -> Self {
        Self {
            status: v.status,
            session_id: v.session_id,
            organization_id: v.organization_id,
            messages: v.messages,
            total_messages: v.total_messages,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct IngestDocumentRequest {
    pub organization_id: String,
    pub filename: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestDocumentResponse {
    pub status: String,
    pub message: String,
    pub pdf_filename: String,
    pub organization_id: String,
    pub chunks_processed: usize,
    pub vectors_stored: usize,
    pub namespace: String,
}

#[derive(Debug, Deserialize)]
pub struct PurgeDocumentsRequest {
    pub organization_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurgeDocumentsResponse {
    pub status: String,
    pub message: String,
    pub organization_id: String,
    pub namespace: String,
    pub vectors_deleted: usize,
}

#[derive(Debug, Deserialize)]
pub struct QueryDocumentsRequest {
    pub query: String,
    pub organization_id: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub score_threshold: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentDto {
    pub content: String,
    pub score: f32,
    pub pdf_filename: String,
    pub chunk_index: usize,
    pub organization_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryDocumentsResponse {
    pub status: String,
    pub query: String,
    pub organization_id: String,
    pub namespace: String,
    pub total_results: usize,
    pub documents: Vec<DocumentDto>,
}

#[derive(Debug, Deserialize)]
pub struct EmotionRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmotionResponse {
    pub emotions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
    pub version: String,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_message_handler(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<ChatMessageRequest>,
) -> Result<Json<ChatMessageResponse>, ApiError> {
    require("Query cannot be empty", &payload.query)?;
    require("Session ID is required", &payload.session_id)?;
    require("Organization ID is required", &payload.organization_id)?;

    let defaults = &state.config.chat;
    let request = ChatRequest {
        session_id: payload.session_id,
        organization_id: payload.organization_id,
        query: payload.query,
        top_k: payload.top_k.unwrap_or(defaults.default_top_k),
        score_threshold: payload
            .score_threshold
            .unwrap_or(defaults.default_score_threshold),
    };
    request.validate().map_err(chat_error)?;

    info!(
        session_id = %request.session_id,
        organization_id = %request.organization_id,
        top_k = request.top_k,
        "api/chat/message request"
    );

    let result = state.engine.chat(request).await.map_err(chat_error)?;
    Ok(Json(result.into()))
}

async fn chat_history_handler(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<SessionRequest>,
) -> Result<Json<HistoryResponse>, ApiError> {
    require("Session ID is required", &payload.session_id)?;
    let view = state
        .engine
        .history(&payload.session_id)
        .await
        .map_err(chat_error)?;
    Ok(Json(view.into()))
}

async fn chat_clear_handler(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<SessionRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    require("Session ID is required", &payload.session_id)?;
    state
        .engine
        .clear(&payload.session_id)
        .await
        .map_err(chat_error)?;
    Ok(Json(StatusResponse {
        status: "success".into(),
        message: format!("Session {} cleared", payload.session_id),
    }))
}

async fn chat_delete_handler(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<SessionRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    require("Session ID is required", &payload.session_id)?;
    state
        .engine
        .delete(&payload.session_id)
        .await
        .map_err(chat_error)?;
    Ok(Json(StatusResponse {
        status: "success".into(),
        message: format!("Session {} deleted", payload.session_id),
    }))
}

async fn ingest_document_handler(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<IngestDocumentRequest>,
) -> Result<Json<IngestDocumentResponse>, ApiError> {
    require("Organization ID is required", &payload.organization_id)?;
    require("Filename is required", &payload.filename)?;
    require("Document text cannot be empty", &payload.text)?;

    let report = state
        .documents
        .ingest(&payload.organization_id, &payload.filename, &payload.text)
        .await
        .map_err(retrieval_error)?;

    Ok(Json(IngestDocumentResponse {
        status: "success".into(),
        message: "Document processed and stored successfully".into(),
        pdf_filename: payload.filename,
        organization_id: payload.organization_id,
        chunks_processed: report.chunks_processed,
        vectors_stored: report.vectors_stored,
        namespace: report.namespace,
    }))
}

async fn purge_documents_handler(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<PurgeDocumentsRequest>,
) -> Result<Json<PurgeDocumentsResponse>, ApiError> {
    require("Organization ID is required", &payload.organization_id)?;

    let vectors_deleted = state
        .documents
        .purge(&payload.organization_id)
        .await
        .map_err(retrieval_error)?;

    Ok(Json(PurgeDocumentsResponse {
        status: "success".into(),
        message: format!("Documents for organization {} deleted", payload.organization_id),
        namespace: state.documents.namespace_for(&payload.organization_id),
        organization_id: payload.organization_id,
        vectors_deleted,
    }))
}

async fn query_documents_handler(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<QueryDocumentsRequest>,
) -> Result<Json<QueryDocumentsResponse>, ApiError> {
    require("Query cannot be empty", &payload.query)?;
    require("Organization ID is required", &payload.organization_id)?;

    let defaults = &state.config.chat;
    let top_k = payload.top_k.unwrap_or(defaults.default_top_k);
    let score_threshold = payload
        .score_threshold
        .unwrap_or(defaults.default_score_threshold);

    validate_retrieval_params(top_k, score_threshold).map_err(chat_error)?;

    let snippets = state
        .documents
        .retrieve(&RetrievalQuery {
            query: payload.query.clone(),
            organization_id: payload.organization_id.clone(),
            top_k,
            score_threshold,
        })
        .await
        .map_err(retrieval_error)?;

    let documents: Vec<DocumentDto> = snippets
        .into_iter()
        .map(|s| DocumentDto {
            content: s.content,
            score: s.score,
            pdf_filename: s.source_id,
            chunk_index: s.position_index,
            organization_id: s.organization_id,
        })
        .collect();

    Ok(Json(QueryDocumentsResponse {
        status: "success".into(),
        namespace: state.documents.namespace_for(&payload.organization_id),
        query: payload.query,
        organization_id: payload.organization_id,
        total_results: documents.len(),
        documents,
    }))
}

async fn emotion_detection_handler(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<EmotionRequest>,
) -> Result<Json<EmotionResponse>, ApiError> {
    require_non_blank("text", &payload.text).map_err(chat_error)?;

    let emotions = state.classifier.classify(&payload.text).await.map_err(|e| {
        error!(error = %e, "Emotion detection failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(EmotionResponse { emotions }))
}

async fn healthcheck_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        message: "Support backend is running successfully".into(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}
