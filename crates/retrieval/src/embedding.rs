//! Embedding-backed retriever and document ingestion.

use crate::index::{ChunkMetadata, VectorIndex, VectorRecord};
use crate::splitter::TextSplitter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use supportline_core::error::RetrievalError;
use supportline_core::provider::{EmbeddingRequest, Provider};
use supportline_core::retrieval::{RetrievalQuery, RetrievedSnippet, Retriever};
use tracing::{debug, info};

/// Stored chunk text is cut to this many characters.
const MAX_STORED_TEXT_CHARS: usize = 1000;

/// Texts sent per embedding request during ingestion.
const EMBED_BATCH_SIZE: usize = 100;

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub chunks_processed: usize,
    pub vectors_stored: usize,
    pub namespace: String,
}

/// Retriever that embeds queries with a [`Provider`] and searches a [`VectorIndex`].
pub struct EmbeddingRetriever {
    embedder: Arc<dyn Provider>,
    index: Arc<dyn VectorIndex>,
    embedding_model: String,
    namespace_prefix: String,
    splitter: TextSplitter,
}

impl EmbeddingRetriever {
    pub fn new(
        embedder: Arc<dyn Provider>,
        index: Arc<dyn VectorIndex>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            embedding_model: embedding_model.into(),
            namespace_prefix: "org_".into(),
            splitter: TextSplitter::default(),
        }
    }

    pub fn from_config(
        embedder: Arc<dyn Provider>,
        index: Arc<dyn VectorIndex>,
        config: &supportline_config::RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            embedding_model: config.embedding_model.clone(),
            namespace_prefix: config.namespace_prefix.clone(),
            splitter: TextSplitter::from_config(config),
        }
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    async fn embed(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let expected = inputs.len();
        let response = self
            .embedder
            .embed(EmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs,
            })
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

        if response.embeddings.len() != expected {
            return Err(RetrievalError::EmbeddingFailed(format!(
                "expected {expected} embeddings, got {}",
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings)
    }

    /// Split, embed, and store a plain-text document in the organization's namespace.
    ///
    /// Chunk ids are `{organization_id}_{source_id}_{i}`, so re-ingesting a
    /// source overwrites its previous chunks position by position.
    pub async fn ingest(
        &self,
        organization_id: &str,
        source_id: &str,
        text: &str,
    ) -> Result<IngestReport, RetrievalError> {
        if text.trim().is_empty() {
            return Err(RetrievalError::InvalidDocument(
                "No text content found in document".into(),
            ));
        }

        let chunks = self.splitter.split(text);
        let namespace = self.namespace_for(organization_id);
        debug!(
            organization_id,
            source_id,
            chunks = chunks.len(),
            "Document split into chunks"
        );

        let mut records = Vec::with_capacity(chunks.len());
        for (batch_no, batch) in chunks.chunks(EMBED_BATCH_SIZE).enumerate() {
            let vectors = self.embed(batch.to_vec()).await?;
            for (offset, (chunk, values)) in batch.iter().zip(vectors).enumerate() {
                let position_index = batch_no * EMBED_BATCH_SIZE + offset;
                records.push(VectorRecord {
                    id: format!("{organization_id}_{source_id}_{position_index}"),
                    values,
                    metadata: ChunkMetadata {
                        organization_id: organization_id.to_string(),
                        source_id: source_id.to_string(),
                        position_index,
                        text: chunk.chars().take(MAX_STORED_TEXT_CHARS).collect(),
                    },
                });
            }
        }

        let vectors_stored = self.index.upsert(&namespace, records).await?;
        info!(
            organization_id,
            source_id,
            namespace = %namespace,
            index = self.index.name(),
            vectors_stored,
            "Document ingested"
        );

        Ok(IngestReport {
            chunks_processed: chunks.len(),
            vectors_stored,
            namespace,
        })
    }

    /// Remove every stored chunk of an organization. Returns how many were dropped.
    pub async fn purge(&self, organization_id: &str) -> Result<usize, RetrievalError> {
        let namespace = self.namespace_for(organization_id);
        let removed = self.index.delete_namespace(&namespace).await?;
        info!(
            organization_id,
            namespace = %namespace,
            index = self.index.name(),
            removed,
            "Documents purged"
        );
        Ok(removed)
    }
}

#[async_trait]
impl Retriever for EmbeddingRetriever {
    async fn retrieve(
        &self,
        query: &RetrievalQuery,
    ) -> Result<Vec<RetrievedSnippet>, RetrievalError> {
        if query.query.trim().is_empty() {
            return Err(RetrievalError::InvalidQuery("query must not be blank".into()));
        }
        if query.top_k == 0 {
            return Ok(Vec::new());
        }

        let namespace = self.namespace_for(&query.organization_id);
        let vector = self
            .embed(vec![query.query.clone()])
            .await?
            .pop()
            .unwrap_or_default();

        let matches = self.index.query(&namespace, &vector, query.top_k).await?;
        let total_matches = matches.len();

        let snippets: Vec<RetrievedSnippet> = matches
            .into_iter()
            .filter(|m| m.score >= query.score_threshold)
            .map(|m| RetrievedSnippet {
                content: m.metadata.text,
                score: m.score.clamp(0.0, 1.0),
                source_id: m.metadata.source_id,
                position_index: m.metadata.position_index,
                organization_id: m.metadata.organization_id,
            })
            .collect();

        debug!(
            namespace = %namespace,
            index = self.index.name(),
            top_k = query.top_k,
            score_threshold = query.score_threshold,
            total_matches,
            kept = snippets.len(),
            "Index searched"
        );

        Ok(snippets)
    }

    fn namespace_for(&self, organization_id: &str) -> String {
        format!("{}{organization_id}", self.namespace_prefix)
    }
}
