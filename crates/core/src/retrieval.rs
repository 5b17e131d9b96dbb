//! Retriever trait: the boundary to the organization-scoped similarity search.
//!
//! A retriever returns scored [`RetrievedSnippet`]s for a query inside one
//! organization's partition. It may return fewer than `top_k` results and
//! gives no ordering guarantee; the chat engine re-ranks and re-thresholds.

use crate::error::RetrievalError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Parameters of one similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalQuery {
    /// Free-text query to embed and search with.
    pub query: String,
    /// Owning organization; selects the partition to search.
    pub organization_id: String,
    /// Maximum number of snippets wanted.
    pub top_k: usize,
    /// Minimum similarity score in [0, 1].
    pub score_threshold: f32,
}

/// One candidate context unit produced by the retriever.
///
/// Never mutated and never cached: snippets live for a single chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedSnippet {
    /// The text content of this snippet.
    pub content: String,
    /// Similarity score in [0, 1], higher is more relevant.
    pub score: f32,
    /// Source document identifier (e.g. the uploaded filename).
    pub source_id: String,
    /// Position of this snippet within its source.
    pub position_index: usize,
    /// Organization the source belongs to.
    pub organization_id: String,
}

/// The retrieval collaborator.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Search the organization's partition for snippets relevant to `query`.
    async fn retrieve(
        &self,
        query: &RetrievalQuery,
    ) -> std::result::Result<Vec<RetrievedSnippet>, RetrievalError>;

    /// The partition name searched for an organization.
    fn namespace_for(&self, organization_id: &str) -> String {
        format!("org_{organization_id}")
    }
}
