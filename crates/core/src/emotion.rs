//! Emotion classifier boundary.
//!
//! Text is tagged with zero or more labels from a fixed 28-label set.
//! How the labels are produced (a trained model, an LLM judge) is up to
//! the implementation.

use crate::error::ClassifierError;
use async_trait::async_trait;

/// The label set, in canonical order. Classifier output follows this order.
pub const EMOTION_LABELS: [&str; 28] = [
    "admiration",
    "amusement",
    "anger",
    "annoyance",
    "approval",
    "caring",
    "confusion",
    "curiosity",
    "desire",
    "disappointment",
    "disapproval",
    "disgust",
    "embarrassment",
    "excitement",
    "fear",
    "gratitude",
    "grief",
    "joy",
    "love",
    "nervousness",
    "optimism",
    "pride",
    "realization",
    "relief",
    "remorse",
    "sadness",
    "surprise",
    "neutral",
];

/// Decode a multi-hot prediction row into label names.
///
/// Entries beyond the label set are ignored.
pub fn labels_from_multi_hot(row: &[bool]) -> Vec<String> {
    EMOTION_LABELS
        .iter()
        .zip(row)
        .filter(|(_, hit)| **hit)
        .map(|(label, _)| (*label).to_string())
        .collect()
}

#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    /// Classify `text`, returning labels from [`EMOTION_LABELS`] in canonical order.
    async fn classify(&self, text: &str) -> std::result::Result<Vec<String>, ClassifierError>;
}
