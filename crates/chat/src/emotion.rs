//! Emotion classification through the generation provider.
//!
//! The model is asked for a JSON array of labels. Unknown labels are
//! discarded and the remainder is returned once each, in canonical order.

use async_trait::async_trait;
use std::sync::Arc;
use supportline_core::emotion::{EMOTION_LABELS, EmotionClassifier, labels_from_multi_hot};
use supportline_core::error::ClassifierError;
use supportline_core::message::Message;
use supportline_core::provider::{Provider, ProviderRequest};

pub struct ProviderEmotionClassifier {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ProviderEmotionClassifier {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    fn instruction() -> String {
        format!(
            "You are an emotion classifier. Identify every emotion expressed in the user's text. \
             Reply with only a JSON array of labels chosen from this list, with no other text: {}. \
             Use [\"neutral\"] when no emotion is expressed.",
            EMOTION_LABELS.join(", ")
        )
    }
}

/// Pull the label array out of raw model output.
///
/// Tolerates surrounding prose or code fences: the first balanced JSON array
/// of strings found at some `[` wins, and anything after it is ignored.
pub fn parse_labels(raw: &str) -> Result<Vec<String>, ClassifierError> {
    let mut last_error = None;
    let mut names = None;
    for (start, _) in raw.match_indices('[') {
        let mut stream =
            serde_json::Deserializer::from_str(&raw[start..]).into_iter::<Vec<String>>();
        match stream.next() {
            Some(Ok(parsed)) => {
                names = Some(parsed);
                break;
            }
            Some(Err(e)) => last_error = Some(e.to_string()),
            None => {}
        }
    }

    let Some(names) = names else {
        return Err(ClassifierError::UnparseableOutput(
            last_error.unwrap_or_else(|| raw.trim().to_string()),
        ));
    };

    let mut row = [false; EMOTION_LABELS.len()];
    for name in &names {
        let name = name.trim().to_lowercase();
        if let Some(i) = EMOTION_LABELS.iter().position(|l| *l == name) {
            row[i] = true;
        }
    }
    Ok(labels_from_multi_hot(&row))
}

#[async_trait]
impl EmotionClassifier for ProviderEmotionClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<String>, ClassifierError> {
        let response = self
            .provider
            .complete(ProviderRequest {
                model: self.model.clone(),
                messages: vec![Message::system(Self::instruction()), Message::user(text)],
                temperature: 0.0,
                max_tokens: Some(64),
            })
            .await
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        let labels = parse_labels(&response.message.content)?;
        tracing::debug!(labels = ?labels, "Text classified");
        Ok(labels)
    }
}
