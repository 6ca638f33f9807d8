//! Generative-model backends.
//!
//! Everything that talks to a model goes through [`GenerativeBackend`]: one
//! prompt (plus optional images) in, the provider's raw JSON out. Response
//! shapes differ between providers, so normalising them into text is left to
//! [`crate::pipeline::summarize::normalize_response`].
//!
//! Two implementations ship:
//!
//! * [`GeminiBackend`] calls the Gemini `generateContent` REST endpoint
//!   directly with reqwest and returns the `candidates` JSON untouched.
//! * [`ProviderBackend`] wraps any edgequake-llm [`LLMProvider`] and returns
//!   `{"text": …}`.
//!
//! ## Retry Strategy
//!
//! Summary calls are made exactly once. OCR calls go through
//! [`generate_with_retry`], which backs off exponentially
//! (`retry_backoff_ms * 2^(attempt-1)`, saturating): with 500 ms base and 2 retries the
//! wait sequence is 500 ms → 1 s.

use crate::error::GenerationError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// One request to a generative model.
#[derive(Clone, Default)]
pub struct GenerationRequest {
    /// Model identifier; `models/` prefix optional.
    pub model: String,
    pub prompt: String,
    /// Inline images sent after the prompt text.
    pub images: Vec<ImageData>,
    pub max_output_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("model", &self.model)
            .field("prompt_chars", &self.prompt.chars().count())
            .field("images", &self.images.len())
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, image: ImageData) -> Self {
        self.images.push(image);
        self
    }

    pub fn with_max_output_tokens(mut self, n: usize) -> Self {
        self.max_output_tokens = Some(n);
        self
    }

    pub fn with_temperature(mut self, t: Option<f32>) -> Self {
        self.temperature = t;
        self
    }
}

/// A model endpoint that turns a prompt into a raw JSON response.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Short name used in logs and error placeholders, e.g. `Gemini`.
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError>;

    /// Model names this backend can serve. Backends without a listing
    /// endpoint return an empty list.
    async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        Ok(Vec::new())
    }
}

/// `models/gemini-2.0-flash` for either `gemini-2.0-flash` or the prefixed form.
pub fn qualified_model_name(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

/// Gemini REST backend (`v1beta/{model}:generateContent`).
///
/// No request timeout and no retry: a slow or failed summary call surfaces
/// to the caller as-is.
#[derive(Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Full endpoint URL for `model`.
    pub fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/{}:generateContent",
            self.base_url,
            qualified_model_name(model)
        )
    }

    /// Model listing URL.
    pub fn models_endpoint(&self) -> String {
        format!("{}/v1beta/models?pageSize=1000", self.base_url)
    }

    /// JSON body for a `generateContent` call.
    pub fn request_body(request: &GenerationRequest) -> Value {
        let mut parts = vec![json!({ "text": request.prompt })];
        for image in &request.images {
            parts.push(json!({
                "inlineData": { "mimeType": image.mime_type, "data": image.data }
            }));
        }

        let mut body = json!({ "contents": [{ "role": "user", "parts": parts }] });

        let mut generation_config = serde_json::Map::new();
        if let Some(n) = request.max_output_tokens {
            generation_config.insert("maxOutputTokens".into(), json!(n));
        }
        if let Some(t) = request.temperature {
            generation_config.insert("temperature".into(), json!(t));
        }
        if !generation_config.is_empty() {
            body["generationConfig"] = Value::Object(generation_config);
        }
        body
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        debug!(
            "Gemini {}: answered in {:?}",
            request.model,
            start.elapsed()
        );
        Ok(value)
    }

    async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let response = self
            .client
            .get(self.models_endpoint())
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        let listing: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        Ok(model_names(&listing))
    }
}

/// `models[].name` of a Gemini model listing, in response order.
fn model_names(listing: &Value) -> Vec<String> {
    listing["models"]
        .as_array()
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Pull `error.message` out of a Gemini error body, else a short raw excerpt.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect::<String>().trim().to_string())
}

/// Adapter from an edgequake-llm provider to [`GenerativeBackend`].
#[derive(Clone)]
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

#[async_trait]
impl GenerativeBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        let message = if request.images.is_empty() {
            ChatMessage::user(request.prompt.as_str())
        } else {
            ChatMessage::user_with_images(request.prompt.as_str(), request.images.clone())
        };

        let options = CompletionOptions {
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&[message], Some(&options))
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );
        Ok(json!({ "text": response.content }))
    }
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`, saturating.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Call `backend`, retrying transport and HTTP failures with exponential backoff.
///
/// `EmptyResponse` and `InvalidResponse` are not retried: asking again
/// rarely changes a well-formed answer.
pub async fn generate_with_retry(
    backend: &dyn GenerativeBackend,
    request: &GenerationRequest,
    max_retries: u32,
    retry_backoff_ms: u64,
) -> Result<Value, GenerationError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(retry_backoff_ms, attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                backend.name(),
                attempt,
                max_retries,
                backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match backend.generate(request).await {
            Ok(value) => return Ok(value),
            Err(e @ (GenerationError::Transport(_) | GenerationError::Status { .. })) => {
                warn!("{}: attempt {} failed: {}", backend.name(), attempt + 1, e);
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or(GenerationError::EmptyResponse))
}
