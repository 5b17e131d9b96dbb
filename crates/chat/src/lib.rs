//! The retrieval-augmented chat session engine.
//!
//! One chat turn runs a strictly ordered pipeline:
//!
//! 1. **Resolve** the session (created lazily, per-key locked for the turn)
//! 2. **Retrieve** scored snippets from the organization's partition
//! 3. **Filter** them by threshold, dedupe, re-rank, and cap at `top_k`
//! 4. **Compile** the prompt: grounded or ungrounded system instruction,
//!    pre-turn history, then the new query
//! 5. **Generate** the answer through the configured provider
//! 6. **Sanitize** the answer so no provenance leaks into user-visible text
//! 7. **Commit** the user and assistant turns, only after generation succeeded
//!
//! Provenance is returned next to the answer, never inside it.

pub mod emotion;
pub mod orchestrator;
pub mod prompt;
pub mod relevance;
pub mod sanitize;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use emotion::ProviderEmotionClassifier;
pub use orchestrator::{ChatEngine, ChatRequest, ChatResult, HistoryView, Provenance};
pub use prompt::compile;
pub use relevance::{RelevantContext, filter_relevant};
pub use sanitize::sanitize;
pub use session::{BoundedHistory, Session, SessionHandle, SessionStore, Turn};
