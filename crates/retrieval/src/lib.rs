//! Organization-scoped document retrieval.
//!
//! Documents are split into overlapping chunks, embedded through a
//! [`Provider`](supportline_core::Provider), and stored in a
//! [`VectorIndex`] partitioned by namespace (one per organization).
//! [`EmbeddingRetriever`] implements the core `Retriever` trait on top.

pub mod embedding;
pub mod index;
pub mod splitter;
pub mod vector;

pub use embedding::{EmbeddingRetriever, IngestReport};
pub use index::{ChunkMetadata, InMemoryVectorIndex, ScoredMatch, VectorIndex, VectorRecord};
pub use splitter::TextSplitter;
pub use vector::cosine_similarity;
