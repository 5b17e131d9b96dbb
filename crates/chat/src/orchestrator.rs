//! The chat orchestrator: sequences one retrieval-augmented turn.
//!
//! A turn either completes fully or leaves the session untouched: history is
//! committed only after generation has succeeded.

use crate::prompt;
use crate::relevance::filter_relevant;
use crate::sanitize::sanitize;
use crate::session::{SessionStore, Turn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use supportline_core::error::{ChatError, Error};
use supportline_core::message::Role;
use supportline_core::provider::{Provider, ProviderRequest};
use supportline_core::retrieval::{RetrievalQuery, Retriever};
use tracing::{debug, info, warn};

/// Bounds enforced by [`ChatRequest::validate`].
pub const TOP_K_RANGE: std::ops::RangeInclusive<usize> = 1..=10;

/// Input of one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub organization_id: String,
    pub query: String,
    pub top_k: usize,
    pub score_threshold: f32,
}

impl ChatRequest {
    /// A request with the default retrieval parameters (top 3, threshold 0.4).
    pub fn new(
        session_id: impl Into<String>,
        organization_id: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            organization_id: organization_id.into(),
            query: query.into(),
            top_k: 3,
            score_threshold: 0.4,
        }
    }

    /// Reject blank identifiers or query and out-of-range retrieval parameters.
    ///
    /// The engine does not call this itself; callers validate before [`ChatEngine::chat`].
    pub fn validate(&self) -> Result<(), ChatError> {
        require_non_blank("session_id", &self.session_id)?;
        require_non_blank("organization_id", &self.organization_id)?;
        require_non_blank("query", &self.query)?;

        validate_retrieval_params(self.top_k, self.score_threshold)
    }
}

/// Check `top_k` against [`TOP_K_RANGE`] and the threshold against 0.0..=1.0.
pub fn validate_retrieval_params(top_k: usize, score_threshold: f32) -> Result<(), ChatError> {
    if !TOP_K_RANGE.contains(&top_k) {
        return Err(ChatError::Validation(format!(
            "top_k must be between {} and {}",
            TOP_K_RANGE.start(),
            TOP_K_RANGE.end()
        )));
    }
    if !(0.0..=1.0).contains(&score_threshold) {
        return Err(ChatError::Validation(
            "score_threshold must be between 0.0 and 1.0".into(),
        ));
    }
    Ok(())
}

/// Reject an empty or whitespace-only field.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), ChatError> {
    if value.trim().is_empty() {
        return Err(ChatError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Where a piece of context came from. Returned beside the answer, never inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_id: String,
    pub position_index: usize,
    pub score: f32,
}

/// Output of one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResult {
    pub status: String,
    pub session_id: String,
    pub organization_id: String,
    pub query: String,
    /// Sanitized answer text.
    pub response: String,
    /// One entry per snippet that passed the relevance filter, best first.
    pub sources: Vec<Provenance>,
    /// Turns in the session after this one was committed.
    pub conversation_length: usize,
    /// Snippets the retriever returned before filtering.
    pub retrieved_documents: usize,
}

/// Read-only view of a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryView {
    pub status: String,
    pub session_id: String,
    pub organization_id: String,
    pub messages: Vec<Turn>,
    pub total_messages: usize,
}

/// The retrieval-augmented chat engine.
pub struct ChatEngine {
    sessions: Arc<SessionStore>,
    retriever: Arc<dyn Retriever>,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ChatEngine {
    pub fn new(
        sessions: Arc<SessionStore>,
        retriever: Arc<dyn Retriever>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            retriever,
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    /// Build an engine using the model settings and history capacity from config.
    pub fn from_config(
        config: &supportline_config::AppConfig,
        retriever: Arc<dyn Retriever>,
        provider: Arc<dyn Provider>,
    ) -> Self {
        Self::new(
            Arc::new(SessionStore::from_config(&config.chat)),
            retriever,
            provider,
            &config.default_model,
        )
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one chat turn.
    ///
    /// The session stays locked for the whole turn, so concurrent turns on the
    /// same session key run one after another. Any collaborator failure
    /// aborts the turn as [`ChatError::Processing`] with no history change.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResult, ChatError> {
        let handle = self
            .sessions
            .get_or_create(&request.session_id, &request.organization_id)
            .await;
        let mut session = handle.lock().await;

        let query = RetrievalQuery {
            query: request.query.clone(),
            organization_id: request.organization_id.clone(),
            top_k: request.top_k,
            score_threshold: request.score_threshold,
        };
        let retrieved = self.retriever.retrieve(&query).await.map_err(|e| {
            warn!(session_id = %request.session_id, error = %e, "Retrieval failed");
            ChatError::Processing(Error::from(e))
        })?;
        let retrieved_documents = retrieved.len();

        let context = filter_relevant(retrieved, request.score_threshold, request.top_k);
        debug!(
            session_id = %request.session_id,
            retrieved = retrieved_documents,
            relevant = context.snippets.len(),
            has_context = context.has_context,
            "Context filtered"
        );

        let history = session.history();
        let messages = prompt::compile(
            &request.query,
            &context.snippets,
            context.has_context,
            &history,
        );

        let response = self
            .provider
            .complete(ProviderRequest {
                model: self.model.clone(),
                messages,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            })
            .await
            .map_err(|e| {
                warn!(
                    session_id = %request.session_id,
                    provider = self.provider.name(),
                    error = %e,
                    "Generation failed"
                );
                ChatError::Processing(Error::from(e))
            })?;

        let answer = sanitize(&response.message.content);

        session.append_turn(Role::User, request.query.as_str());
        session.append_turn(Role::Assistant, answer.as_str());
        let conversation_length = session.len();
        drop(session);

        info!(
            session_id = %request.session_id,
            organization_id = %request.organization_id,
            sources = context.snippets.len(),
            conversation_length,
            "Chat turn completed"
        );

        let sources = context
            .snippets
            .into_iter()
            .map(|s| Provenance {
                source_id: s.source_id,
                position_index: s.position_index,
                score: s.score,
            })
            .collect();

        Ok(ChatResult {
            status: "success".into(),
            session_id: request.session_id,
            organization_id: request.organization_id,
            query: request.query,
            response: answer,
            sources,
            conversation_length,
            retrieved_documents,
        })
    }

    /// The session's turns, oldest first.
    pub async fn history(&self, session_id: &str) -> Result<HistoryView, ChatError> {
        let handle = self
            .sessions
            .get(session_id)
            .await
            .ok_or_else(ChatError::session_not_found)?;
        let session = handle.lock().await;
        let messages = session.history();

        Ok(HistoryView {
            status: "success".into(),
            session_id: session.session_id().to_string(),
            organization_id: session.organization_id().to_string(),
            total_messages: messages.len(),
            messages,
        })
    }

    /// Empty a session's history; the session itself remains.
    pub async fn clear(&self, session_id: &str) -> Result<(), ChatError> {
        if self.sessions.clear(session_id).await {
            info!(session_id, "Session cleared");
            Ok(())
        } else {
            Err(ChatError::session_not_found())
        }
    }

    /// Remove a session. A turn already running on it finishes against the removed copy.
    pub async fn delete(&self, session_id: &str) -> Result<(), ChatError> {
        if self.sessions.delete(session_id).await {
            info!(session_id, "Session deleted");
            Ok(())
        } else {
            Err(ChatError::session_not_found())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedProvider, StaticRetriever, snippet};
    use supportline_core::error::{ProviderError, RetrievalError};

    fn engine(retriever: Arc<StaticRetriever>, provider: Arc<ScriptedProvider>) -> ChatEngine {
        ChatEngine::new(
            Arc::new(SessionStore::new(10)),
            retriever,
            provider,
            "gemini-2.5-flash-lite",
        )
    }

    #[tokio::test]
    async fn ungrounded_turn_has_no_sources() {
        let retriever = Arc::new(StaticRetriever::empty());
        let provider = Arc::new(ScriptedProvider::replies(&[
            "I don't have that information right now. Please contact our support team.",
        ]));
        let engine = engine(retriever, Arc::clone(&provider));

        let result = engine
            .chat(ChatRequest::new("s1", "acme", "What are your business hours?"))
            .await
            .unwrap();

        assert_eq!(result.status, "success");
        assert!(result.sources.is_empty());
        assert_eq!(result.retrieved_documents, 0);
        assert_eq!(result.conversation_length, 2);

        let sent = &provider.requests()[0].messages;
        assert_eq!(sent.len(), 2);
        assert!(!sent[0].content.contains("[Document"));
        assert!(sent[0].content.contains("Never claim to have checked documentation"));
    }

    #[tokio::test]
    async fn grounded_turn_orders_provenance_by_score() {
        let retriever = Arc::new(StaticRetriever::returning(vec![
            snippet("shipping.pdf", 2, 0.55),
            snippet("refunds.pdf", 0, 0.91),
        ]));
        let provider = Arc::new(ScriptedProvider::replies(&["Refunds take five days."]));
        let engine = engine(Arc::clone(&retriever), Arc::clone(&provider));

        let mut request = ChatRequest::new("s1", "acme", "How long do refunds take?");
        request.top_k = 3;
        request.score_threshold = 0.4;
        let result = engine.chat(request).await.unwrap();

        let scores: Vec<f32> = result.sources.iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![0.91, 0.55]);
        assert_eq!(result.sources[0].source_id, "refunds.pdf");
        assert_eq!(result.retrieved_documents, 2);

        let seen = retriever.queries();
        assert_eq!(seen[0].organization_id, "acme");
        assert_eq!(seen[0].top_k, 3);

        let system = &provider.requests()[0].messages[0].content;
        assert!(system.contains("[Document 1 — Score: 0.91]"));
        assert!(system.contains("[Document 2 — Score: 0.55]"));
    }

    #[tokio::test]
    async fn answer_is_sanitized_but_sources_survive() {
        let retriever = Arc::new(StaticRetriever::returning(vec![snippet("faq.pdf", 1, 0.8)]));
        let provider = Arc::new(ScriptedProvider::replies(&[
            "We open at 9am.\nSee faq.pdf for more.\nSources: faq.pdf, chunk 1",
        ]));
        let engine = engine(retriever, provider);

        let result = engine
            .chat(ChatRequest::new("s1", "acme", "When do you open?"))
            .await
            .unwrap();

        assert_eq!(result.response, "We open at 9am.");
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].source_id, "faq.pdf");
    }

    #[tokio::test]
    async fn compiler_sees_pre_turn_history() {
        let retriever = Arc::new(StaticRetriever::empty());
        let provider = Arc::new(ScriptedProvider::replies(&["Hello!", "Bye!"]));
        let engine = engine(retriever, Arc::clone(&provider));

        engine.chat(ChatRequest::new("s1", "acme", "hi")).await.unwrap();
        let second = engine.chat(ChatRequest::new("s1", "acme", "bye")).await.unwrap();
        assert_eq!(second.conversation_length, 4);

        let requests = provider.requests();
        let contents: Vec<&str> = requests[1].messages[1..]
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["hi", "Hello!", "bye"]);
    }

    #[tokio::test]
    async fn failed_generation_leaves_history_untouched() {
        let retriever = Arc::new(StaticRetriever::empty());
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::Timeout(
            "deadline".into(),
        )));
        let engine = engine(retriever, provider);

        let err = engine
            .chat(ChatRequest::new("s1", "acme", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Processing(_)));
        assert!(err.to_string().starts_with("Error in chat:"));

        let view = engine.history("s1").await.unwrap();
        assert_eq!(view.total_messages, 0);
    }

    #[tokio::test]
    async fn failed_retrieval_is_processing_error() {
        let retriever = Arc::new(StaticRetriever::failing(RetrievalError::IndexUnavailable(
            "down".into(),
        )));
        let provider = Arc::new(ScriptedProvider::replies(&[]));
        let engine = engine(retriever, Arc::clone(&provider));

        let err = engine
            .chat(ChatRequest::new("s1", "acme", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Processing(Error::Retrieval(_))));
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn history_clear_and_delete() {
        let retriever = Arc::new(StaticRetriever::empty());
        let provider = Arc::new(ScriptedProvider::replies(&["Hello!"]));
        let engine = engine(retriever, provider);

        engine.chat(ChatRequest::new("s1", "acme", "hi")).await.unwrap();

        let view = engine.history("s1").await.unwrap();
        assert_eq!(view.organization_id, "acme");
        assert_eq!(view.messages, vec![Turn::user("hi"), Turn::assistant("Hello!")]);

        engine.clear("s1").await.unwrap();
        assert_eq!(engine.history("s1").await.unwrap().total_messages, 0);

        engine.delete("s1").await.unwrap();
        assert!(matches!(
            engine.history("s1").await.unwrap_err(),
            ChatError::NotFound(_)
        ));
        assert!(matches!(
            engine.clear("s1").await.unwrap_err(),
            ChatError::NotFound(_)
        ));
        assert!(matches!(
            engine.delete("s1").await.unwrap_err(),
            ChatError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn concurrent_turns_on_one_session_are_serialized() {
        let retriever = Arc::new(StaticRetriever::empty());
        let replies: Vec<String> = (0..8).map(|i| format!("reply {i}")).collect();
        let provider = Arc::new(ScriptedProvider::new(replies.into_iter().map(Ok).collect()));
        let engine = Arc::new(engine(retriever, provider));

        let mut tasks = Vec::new();
        for i in 0..8 {
            let engine = Arc::clone(&engine);
            tasks.push(tokio::spawn(async move {
                engine
                    .chat(ChatRequest::new("shared", "acme", format!("q{i}")))
                    .await
                    .unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let view = engine.history("shared").await.unwrap();
        assert_eq!(view.total_messages, 10);
        for pair in view.messages.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
        }
    }

    #[test]
    fn request_validation() {
        assert!(ChatRequest::new("s", "o", "q").validate().is_ok());
        assert!(matches!(
            ChatRequest::new("  ", "o", "q").validate(),
            Err(ChatError::Validation(_))
        ));
        assert!(ChatRequest::new("s", "", "q").validate().is_err());
        assert!(ChatRequest::new("s", "o", "\n").validate().is_err());

        let mut request = ChatRequest::new("s", "o", "q");
        request.top_k = 11;
        assert!(request.validate().is_err());
        request.top_k = 1;
        request.score_threshold = -0.1;
        assert!(request.validate().is_err());
    }

    #[test]
    fn retrieval_params_bounds() {
        assert!(validate_retrieval_params(1, 0.0).is_ok());
        assert!(validate_retrieval_params(10, 1.0).is_ok());
        assert!(validate_retrieval_params(0, 0.4).is_err());
        assert!(validate_retrieval_params(11, 0.4).is_err());
        assert!(validate_retrieval_params(3, 1.01).is_err());
        assert!(matches!(
            validate_retrieval_params(3, f32::NAN),
            Err(ChatError::Validation(_))
        ));
    }
}
