//! # supportline core
//!
//! Domain types, collaborator traits, and error definitions for the
//! supportline customer-support backend. This crate has **no framework
//! dependencies**: it defines the model every other crate implements against.
//!
//! ## Collaborators
//!
//! The chat engine talks to the outside world through three traits:
//! - [`Provider`] generates text (and embeddings) from an ordered message list
//! - [`Retriever`] finds scored context snippets inside an organization's partition
//! - [`EmotionClassifier`] tags free text with emotion labels
//!
//! Implementations live in their own crates, so tests swap in scripted stubs.

pub mod emotion;
pub mod error;
pub mod message;
pub mod provider;
pub mod retrieval;

// Re-export key types at crate root for ergonomics
pub use emotion::{EMOTION_LABELS, EmotionClassifier};
pub use error::{ChatError, Error, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use retrieval::{RetrievalQuery, RetrievedSnippet, Retriever};
