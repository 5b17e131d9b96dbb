//! Vector index boundary and the in-memory backend.
//!
//! An index stores embedded chunks in named partitions. Queries never cross
//! a namespace: the namespace is the organization isolation boundary.

use crate::vector::cosine_similarity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use supportline_core::error::RetrievalError;
use tokio::sync::RwLock;

/// Metadata stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub organization_id: String,
    /// Source document name (e.g. the uploaded filename).
    pub source_id: String,
    /// Position of the chunk within its source.
    pub position_index: usize,
    /// Chunk text, possibly truncated.
    pub text: String,
}

/// One embedded chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A query hit with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredMatch {
    pub id: String,
    pub score: f32,
    pub metadata: ChunkMetadata,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Insert or replace records (keyed by id). Returns the number written.
    async fn upsert(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, RetrievalError>;

    /// The `top_k` nearest records in `namespace`, best first.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredMatch>, RetrievalError>;

    /// Drop a whole namespace. Returns the number of records removed.
    async fn delete_namespace(&self, namespace: &str) -> Result<usize, RetrievalError>;
}

/// An index held in process memory. Contents are lost on restart.
pub struct InMemoryVectorIndex {
    namespaces: Arc<RwLock<HashMap<String, HashMap<String, VectorRecord>>>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            namespaces: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn upsert(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, RetrievalError> {
        let written = records.len();
        let mut namespaces = self.namespaces.write().await;
        let partition = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            partition.insert(record.id.clone(), record);
        }
        Ok(written)
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredMatch>, RetrievalError> {
        let namespaces = self.namespaces.read().await;
        let Some(partition) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<ScoredMatch> = partition
            .values()
            .map(|record| ScoredMatch {
                id: record.id.clone(),
                score: cosine_similarity(&record.values, vector),
                metadata: record.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<usize, RetrievalError> {
        Ok(self
            .namespaces
            .write()
            .await
            .remove(namespace)
            .map_or(0, |partition| partition.len()))
    }
}
