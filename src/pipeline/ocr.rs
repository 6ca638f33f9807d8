//! OCR seam.
//!
//! [`OcrEngine`] turns one (already grayscale) image into text. The shipped
//! implementation, [`VisionOcr`], sends the image to a vision-capable model
//! with a transcription prompt; hosts with a local engine can plug in their
//! own through [`crate::config::MedLensConfigBuilder::ocr_engine`].

use crate::error::{ExtractionFailure, GenerationError};
use crate::pipeline::llm::{generate_with_retry, GenerationRequest, GenerativeBackend};
use crate::pipeline::{encode, summarize::normalize_response};
use crate::prompts::OCR_PROMPT;
use async_trait::async_trait;
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Recognises text in a single image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Text found in `image`; an empty string when there is none.
    async fn recognize(&self, image: &DynamicImage) -> Result<String, ExtractionFailure>;
}

/// OCR through a vision-capable generative model.
pub struct VisionOcr {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl VisionOcr {
    pub fn new(backend: Arc<dyn GenerativeBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }

    pub fn with_retries(mut self, max_retries: u32, retry_backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = retry_backoff_ms;
        self
    }
}

#[async_trait]
impl OcrEngine for VisionOcr {
    fn name(&self) -> &str {
        "vision"
    }

    async fn recognize(&self, image: &DynamicImage) -> Result<String, ExtractionFailure> {
        let start = Instant::now();
        let data = encode::encode_png(image).map_err(|e| {
            ExtractionFailure::engine(format!("Could not encode image for OCR: {e}"))
        })?;

        let request = GenerationRequest::new(self.model.as_str(), OCR_PROMPT)
            .with_image(data)
            .with_temperature(Some(0.0));

        let value = generate_with_retry(
            self.backend.as_ref(),
            &request,
            self.max_retries,
            self.retry_backoff_ms,
        )
        .await
        .map_err(|e| match e {
            GenerationError::EmptyResponse => {
                ExtractionFailure::engine("OCR model returned no output")
            }
            other => ExtractionFailure::engine(format!(
                "OCR via {} failed: {other}",
                self.backend.name()
            )),
        })?;

        let text = normalize_response(&value).unwrap_or_default();
        debug!(
            "OCR {}x{} → {} chars in {:?}",
            image.width(),
            image.height(),
            text.len(),
            start.elapsed()
        );
        Ok(text.trim().to_string())
    }
}
