//! Summarisation client: one prompt in, one displayable string out.
//!
//! [`SummaryClient::try_summarize`] keeps the structured error;
//! [`SummaryClient::summarize`] folds every failure into a placeholder so a
//! caller that only wants text can never see an error.

use crate::error::GenerationError;
use crate::options::{SummaryOptions, SummaryVariant};
use crate::output::SummaryResult;
use crate::pipeline::llm::{GenerationRequest, GenerativeBackend};
use crate::pipeline::postprocess::clean_summary;
use crate::pipeline::prompt::PromptText;
use crate::prompts::{model_error, NO_MODEL_OUTPUT};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Text from either response shape.
///
/// A non-empty top-level `text` field wins; otherwise the first part of the
/// first candidate (`candidates[0].content.parts[0].text`).
pub fn normalize_response(value: &Value) -> Option<String> {
    if let Some(text) = value.get("text").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return Some(text.to_string());
        }
    }
    value
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
}

#[derive(Clone)]
pub struct SummaryClient {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
    temperature: Option<f32>,
}

impl SummaryClient {
    pub fn new(backend: Arc<dyn GenerativeBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// One generation call, no retry. Successful text is cleaned up; a reply
    /// that cleans up to nothing counts as [`GenerationError::EmptyResponse`].
    pub async fn try_summarize(
        &self,
        prompt: &str,
        max_output_tokens: Option<usize>,
    ) -> Result<String, GenerationError> {
        let mut request = GenerationRequest::new(self.model.as_str(), prompt)
            .with_temperature(self.temperature);
        request.max_output_tokens = max_output_tokens;

        let value = self.backend.generate(&request).await?;
        let text = normalize_response(&value).ok_or(GenerationError::EmptyResponse)?;
        let cleaned = clean_summary(&text);
        if cleaned.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(cleaned)
    }

    /// Never fails: errors become placeholder text.
    pub async fn summarize(&self, prompt: &str) -> String {
        match self.try_summarize(prompt, None).await {
            Ok(text) => text,
            Err(e) => self.placeholder(&e),
        }
    }

    /// Summarise `prompt` framed as `variant`.
    pub async fn summarize_variant(
        &self,
        prompt: &PromptText,
        variant: SummaryVariant,
        options: &SummaryOptions,
    ) -> SummaryResult {
        let start = Instant::now();
        let request_prompt = prompt.for_variant(variant);
        let hint = variant.length_hint(options.max_length);

        let outcome = self.try_summarize(request_prompt.as_str(), Some(hint)).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(text) => {
                debug!("{}: {} chars in {}ms", variant, text.len(), duration_ms);
                SummaryResult {
                    variant,
                    text,
                    error: None,
                    duration_ms,
                }
            }
            Err(e) => {
                warn!("{}: {} call failed: {}", variant, self.backend.name(), e);
                SummaryResult {
                    variant,
                    text: self.placeholder(&e),
                    error: Some(e),
                    duration_ms,
                }
            }
        }
    }

    fn placeholder(&self, error: &GenerationError) -> String {
        match error {
            GenerationError::EmptyResponse => NO_MODEL_OUTPUT.to_string(),
            other => model_error(self.backend.name(), &other.to_string()),
        }
    }
}
