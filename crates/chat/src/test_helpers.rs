//! Shared test helpers: scripted collaborators and fixture builders.

use async_trait::async_trait;
use std::sync::Mutex;
use supportline_core::error::{ProviderError, RetrievalError};
use supportline_core::message::Message;
use supportline_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use supportline_core::retrieval::{RetrievalQuery, RetrievedSnippet, Retriever};

pub fn snippet(source: &str, position: usize, score: f32) -> RetrievedSnippet {
    RetrievedSnippet {
        content: format!("content of {source}#{position}"),
        score,
        source_id: source.to_string(),
        position_index: position,
        organization_id: "acme".into(),
    }
}

/// A provider that replays scripted outcomes and records every request.
///
/// Panics if called more times than it has outcomes.
pub struct ScriptedProvider {
    outcomes: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(outcomes: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok((*t).to_string())).collect())
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);

        let mut outcomes = self.outcomes.lock().unwrap();
        assert!(!outcomes.is_empty(), "ScriptedProvider: no more outcomes");
        let text = outcomes.remove(0)?;

        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model,
        })
    }
}

/// A retriever returning a fixed result and recording the queries it saw.
pub struct StaticRetriever {
    result: Result<Vec<RetrievedSnippet>, RetrievalError>,
    queries: Mutex<Vec<RetrievalQuery>>,
}

impl StaticRetriever {
    pub fn returning(snippets: Vec<RetrievedSnippet>) -> Self {
        Self {
            result: Ok(snippets),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    pub fn failing(error: RetrievalError) -> Self {
        Self {
            result: Err(error),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<RetrievalQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(
        &self,
        query: &RetrievalQuery,
    ) -> Result<Vec<RetrievedSnippet>, RetrievalError> {
        self.queries.lock().unwrap().push(query.clone());
        self.result.clone()
    }
}
