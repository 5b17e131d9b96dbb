//! Error types for the supportline domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator has its own error enum; [`Error`] unifies them and
//! [`ChatError`] is the taxonomy callers of the chat engine branch on.

use thiserror::Error;

/// The top-level error type for pipeline failures.
#[derive(Debug, Error)]
pub enum Error {
    // --- Collaborator errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy of the chat engine.
///
/// Callers map the variant (not the message) to a response class:
/// `Validation` is a client error, `NotFound` a missing session, and
/// `Processing` a server-side failure that wraps the original cause.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Error in chat: {0}")]
    Processing(#[from] Error),
}

impl ChatError {
    /// Shorthand for the "unknown session" case shared by history/clear/delete.
    pub fn session_not_found() -> Self {
        Self::NotFound("Session not found".into())
    }
}

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Invalid retrieval query: {0}")]
    InvalidQuery(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    #[error("Classifier model unavailable: {0}")]
    Unavailable(String),

    #[error("Could not parse classifier output: {0}")]
    UnparseableOutput(String),
}
