//! End-to-end tests for the support chat pipeline.
//!
//! These exercise ingestion, retrieval, the chat engine, and the HTTP
//! gateway together, with a scripted provider standing in for the model.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use supportline_chat::{ChatEngine, ChatRequest, ProviderEmotionClassifier, SessionStore};
use supportline_config::AppConfig;
use supportline_core::error::{ChatError, ProviderError};
use supportline_core::message::{Message, Role};
use supportline_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
use supportline_gateway::{GatewayState, SharedState, build_router};
use supportline_retrieval::{EmbeddingRetriever, InMemoryVectorIndex, TextSplitter};

// ── Mock Provider ────────────────────────────────────────────────────────

/// Replays scripted completions in order and embeds text as letter counts.
struct ScriptedProvider {
    replies: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn text(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok((*r).to_string())).collect())
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);

        let mut replies = self.replies.lock().unwrap();
        assert!(!replies.is_empty(), "ScriptedProvider: no more replies");
        let text = replies.remove(0)?;

        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            }),
            model,
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let embeddings = request.inputs.iter().map(|t| letter_counts(t)).collect();
        Ok(EmbeddingResponse {
            embeddings,
            model: request.model,
        })
    }
}

fn letter_counts(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 26];
    for c in text.to_lowercase().chars().filter(char::is_ascii_lowercase) {
        v[(c as u8 - b'a') as usize] += 1.0;
    }
    v
}

const POLICY: &str = "Refunds are accepted within thirty days of purchase.\n\n\
                      Shipping takes five business days within the country.";

// ── Helpers ──────────────────────────────────────────────────────────────

fn pipeline(provider: Arc<ScriptedProvider>) -> (ChatEngine, Arc<EmbeddingRetriever>) {
    let documents = Arc::new(
        EmbeddingRetriever::new(
            provider.clone(),
            Arc::new(InMemoryVectorIndex::new()),
            "letters",
        )
        .with_splitter(TextSplitter::new(60, 0)),
    );
    let engine = ChatEngine::new(
        Arc::new(SessionStore::new(10)),
        documents.clone(),
        provider,
        "mock-model",
    );
    (engine, documents)
}

fn gateway(provider: Arc<ScriptedProvider>) -> SharedState {
    let (engine, documents) = pipeline(provider.clone());
    Arc::new(GatewayState {
        config: AppConfig::default(),
        engine: Arc::new(engine),
        documents,
        classifier: Arc::new(ProviderEmotionClassifier::new(provider, "mock-model")),
    })
}

async fn call(
    state: &SharedState,
    method: &str,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();

    let response = build_router(state.clone()).oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ── Engine-level flows ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_ingested_document_grounds_the_answer() {
    let provider = Arc::new(ScriptedProvider::text(&[
        "You can get a refund within thirty days.\nSource: policy.txt, chunk 0",
    ]));
    let (engine, documents) = pipeline(provider.clone());

    let report = documents.ingest("acme", "policy.txt", POLICY).await.unwrap();
    assert_eq!(report.chunks_processed, 2);
    assert_eq!(report.vectors_stored, 2);
    assert_eq!(report.namespace, "org_acme");

    let result = engine
        .chat(ChatRequest::new("s-1", "acme", "Can I get a refund on my purchase?"))
        .await
        .unwrap();

    assert_eq!(result.status, "success");
    assert_eq!(result.response, "You can get a refund within thirty days.");
    assert_eq!(result.retrieved_documents, 2);
    assert_eq!(result.sources.len(), 2);
    assert_eq!(result.sources[0].source_id, "policy.txt");
    assert_eq!(result.sources[0].position_index, 0);
    assert!(result.sources[0].score >= result.sources[1].score);
    assert_eq!(result.conversation_length, 2);

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    let system = &requests[0].messages[0];
    assert_eq!(system.role, Role::System);
    assert!(system.content.contains("[Document 1"));
    assert!(system.content.contains("Refunds are accepted within thirty days"));
}

#[tokio::test]
async fn e2e_follow_up_turn_carries_history() {
    let provider = Arc::new(ScriptedProvider::text(&[
        "Refunds are accepted for thirty days.",
        "Shipping takes five business days.",
    ]));
    let (engine, documents) = pipeline(provider.clone());
    documents.ingest("acme", "policy.txt", POLICY).await.unwrap();

    engine
        .chat(ChatRequest::new("s-2", "acme", "How long do refunds take?"))
        .await
        .unwrap();
    let second = engine
        .chat(ChatRequest::new("s-2", "acme", "And what about shipping?"))
        .await
        .unwrap();
    assert_eq!(second.conversation_length, 4);

    let messages = &provider.requests()[1].messages;
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[1].content, "How long do refunds take?");
    assert_eq!(messages[2].content, "Refunds are accepted for thirty days.");
    assert_eq!(messages[3].content, "And what about shipping?");

    let history = engine.history("s-2").await.unwrap();
    assert_eq!(history.total_messages, 4);
    assert_eq!(history.organization_id, "acme");
}

#[tokio::test]
async fn e2e_other_organization_sees_no_documents() {
    let provider = Arc::new(ScriptedProvider::text(&[
        "I don't have that information right now. Please contact our support team.",
    ]));
    let (engine, documents) = pipeline(provider.clone());
    documents.ingest("acme", "policy.txt", POLICY).await.unwrap();

    let result = engine
        .chat(ChatRequest::new("s-3", "globex", "Can I get a refund on my purchase?"))
        .await
        .unwrap();

    assert!(result.sources.is_empty());
    assert_eq!(result.retrieved_documents, 0);
    let system = &provider.requests()[0].messages[0].content;
    assert!(!system.contains("[Document"));
    assert!(!system.contains("Refunds are accepted"));
}

#[tokio::test]
async fn e2e_generation_failure_leaves_history_untouched() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok("Refunds take thirty days.".into()),
        Err(ProviderError::RateLimited {
            retry_after_secs: 30,
        }),
    ]));
    let (engine, documents) = pipeline(provider.clone());
    documents.ingest("acme", "policy.txt", POLICY).await.unwrap();

    engine
        .chat(ChatRequest::new("s-4", "acme", "How long do refunds take?"))
        .await
        .unwrap();
    let err = engine
        .chat(ChatRequest::new("s-4", "acme", "And what about shipping?"))
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Processing(_)));
    assert_eq!(engine.history("s-4").await.unwrap().total_messages, 2);
}

// ── Through the HTTP gateway ─────────────────────────────────────────────

#[tokio::test]
async fn e2e_gateway_ingest_chat_history_delete() {
    let provider = Arc::new(ScriptedProvider::text(&[
        "Refunds are accepted within thirty days of purchase.",
    ]));
    let state = gateway(provider);

    let (status, body) = call(
        &state,
        "POST",
        "/api/documents",
        serde_json::json!({"organization_id": "acme", "filename": "policy.txt", "text": POLICY}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chunks_processed"], 2);
    assert_eq!(body["namespace"], "org_acme");

    let (status, body) = call(
        &state,
        "POST",
        "/api/chat/message",
        serde_json::json!({
            "session_id": "web-1",
            "organization_id": "acme",
            "query": "Can I get a refund on my purchase?",
            "top_k": 1
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversation_length"], 2);
    assert_eq!(body["sources"].as_array().unwrap().len(), 1);
    assert_eq!(body["sources"][0]["pdf_filename"], "policy.txt");
    assert_eq!(body["sources"][0]["chunk_index"], 0);

    let (status, body) = call(
        &state,
        "POST",
        "/api/chat/history",
        serde_json::json!({"session_id": "web-1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_messages"], 2);
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][1]["role"], "assistant");

    let (status, _) = call(
        &state,
        "DELETE",
        "/api/chat/session",
        serde_json::json!({"session_id": "web-1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &state,
        "POST",
        "/api/chat/history",
        serde_json::json!({"session_id": "web-1"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Session not found");
}

#[tokio::test]
async fn e2e_gateway_document_search_is_scoped_to_organization() {
    let state = gateway(Arc::new(ScriptedProvider::text(&[])));

    call(
        &state,
        "POST",
        "/api/documents",
        serde_json::json!({"organization_id": "acme", "filename": "policy.txt", "text": POLICY}),
    )
    .await;

    let (status, body) = call(
        &state,
        "POST",
        "/api/pdf/query",
        serde_json::json!({"query": "And what about shipping?", "organization_id": "acme"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_results"], 2);
    assert_eq!(body["documents"][0]["chunk_index"], 1);
    assert_eq!(body["documents"][0]["organization_id"], "acme");

    let (status, body) = call(
        &state,
        "POST",
        "/api/pdf/query",
        serde_json::json!({"query": "And what about shipping?", "organization_id": "globex"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_results"], 0);
    assert_eq!(body["namespace"], "org_globex");
}
