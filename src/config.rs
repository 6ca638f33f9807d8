//! Process-wide configuration for the medlens pipeline.
//!
//! [`MedLensConfig`] holds everything that is fixed for the lifetime of the
//! process: credentials, model identifier, extraction policies and keyword
//! list. Per-upload choices (language, tone, persona) live in
//! [`crate::options::SummaryOptions`] instead.
//!
//! Build it with [`MedLensConfig::builder()`] or read it from the
//! environment with [`MedLensConfig::from_env()`].

use crate::error::MedLensError;
use crate::options::SummaryVariant;
use crate::pipeline::llm::GenerativeBackend;
use crate::pipeline::ocr::OcrEngine;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Model used when `MODEL_NAME` is not set.
pub const DEFAULT_MODEL: &str = "models/gemini-2.0-flash";

/// Gemini REST endpoint root.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Keywords that raise the "possibly urgent" banner.
pub const DEFAULT_CRITICAL_KEYWORDS: [&str; 8] = [
    "urgent",
    "emergency",
    "acute",
    "critical",
    "bleeding",
    "fracture",
    "infarct",
    "stroke",
];

/// Configuration for report analysis.
///
/// # Example
/// ```rust
/// use medlens::{MedLensConfig, PdfOcrFallback};
///
/// let config = MedLensConfig::builder()
///     .api_key("test-key")
///     .model("models/gemini-2.0-flash")
///     .pdf_ocr_fallback(PdfOcrFallback::Disabled)
///     .build()
///     .unwrap();
/// assert!(config.require_credential().is_ok());
/// ```
#[derive(Clone)]
pub struct MedLensConfig {
    /// Google API key for the Gemini REST backend.
    pub api_key: Option<String>,

    /// Model identifier, e.g. `models/gemini-2.0-flash`. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Named edgequake-llm provider (`openai`, `anthropic`, `ollama`, …).
    /// When set, calls go through that provider instead of Gemini REST.
    pub provider_name: Option<String>,

    /// Pre-constructed backend. Takes precedence over `provider_name` and `api_key`.
    pub backend: Option<Arc<dyn GenerativeBackend>>,

    /// Pre-constructed OCR engine. Takes precedence over `ocr`.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Whether OCR runs through the configured vision-capable model. Default: Vision.
    pub ocr: OcrMode,

    /// Model used for OCR calls. Falls back to `model`.
    pub ocr_model: Option<String>,

    /// OCR for PDFs without a text layer. Default: Automatic.
    pub pdf_ocr_fallback: PdfOcrFallback,

    /// What to do when extraction yields no genuine text. Default: Summarize.
    pub on_extraction_failure: ExtractionFailurePolicy,

    /// Case-insensitive substrings that flag a report as possibly urgent.
    pub critical_keywords: Vec<String>,

    /// Variants to generate, in order. Default: patient, clinician, next steps.
    pub variants: Vec<SummaryVariant>,

    /// Longest edge in pixels when rasterising PDF pages for OCR. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Retries per OCR call. Default: 2. Summary calls are never retried.
    pub ocr_max_retries: u32,

    /// Initial OCR retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Sampling temperature. `None` leaves the provider default.
    pub temperature: Option<f32>,

    /// Root URL of the Gemini REST API. Default: [`DEFAULT_API_BASE_URL`].
    pub api_base_url: String,

    /// Optional per-stage progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for MedLensConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            backend: None,
            ocr_engine: None,
            ocr: OcrMode::default(),
            ocr_model: None,
            pdf_ocr_fallback: PdfOcrFallback::default(),
            on_extraction_failure: ExtractionFailurePolicy::default(),
            critical_keywords: DEFAULT_CRITICAL_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            variants: SummaryVariant::ALL.to_vec(),
            max_rendered_pixels: 2000,
            ocr_max_retries: 2,
            retry_backoff_ms: 500,
            temperature: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for MedLensConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MedLensConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("ocr_engine", &self.ocr_engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field("ocr", &self.ocr)
            .field("ocr_model", &self.ocr_model)
            .field("pdf_ocr_fallback", &self.pdf_ocr_fallback)
            .field("on_extraction_failure", &self.on_extraction_failure)
            .field("critical_keywords", &self.critical_keywords)
            .field("variants", &self.variants)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("ocr_max_retries", &self.ocr_max_retries)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl MedLensConfig {
    /// Create a new builder for `MedLensConfig`.
    pub fn builder() -> MedLensConfigBuilder {
        MedLensConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read `GOOGLE_API_KEY`, `MODEL_NAME` and `MEDLENS_PROVIDER`.
    ///
    /// Fails with [`MedLensError::MissingCredential`] when no credential
    /// is available, so callers can halt before accepting any upload.
    pub fn from_env() -> Result<Self, MedLensError> {
        let mut builder = Self::builder();
        if let Some(key) = non_empty_env("GOOGLE_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Some(model) = non_empty_env("MODEL_NAME") {
            builder = builder.model(model);
        }
        if let Some(provider) = non_empty_env("MEDLENS_PROVIDER") {
            builder = builder.provider_name(provider);
        }
        let config = builder.build()?;
        config.require_credential()?;
        Ok(config)
    }

    /// Whether some way of reaching a model is configured.
    pub fn has_credential(&self) -> bool {
        self.backend.is_some()
            || self.provider_name.is_some()
            || self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Startup check: error unless a model can be reached.
    pub fn require_credential(&self) -> Result<(), MedLensError> {
        if self.has_credential() {
            Ok(())
        } else {
            Err(MedLensError::MissingCredential {
                hint: "GOOGLE_API_KEY not found. Export it (or pass --api-key), \
                       or name a provider with MEDLENS_PROVIDER."
                    .to_string(),
            })
        }
    }

    /// Model used for OCR calls.
    pub fn effective_ocr_model(&self) -> &str {
        self.ocr_model.as_deref().unwrap_or(&self.model)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Builder for [`MedLensConfig`].
#[derive(Debug)]
pub struct MedLensConfigBuilder {
    config: MedLensConfig,
}

impl MedLensConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn GenerativeBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    pub fn ocr(mut self, mode: OcrMode) -> Self {
        self.config.ocr = mode;
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr_model = Some(model.into());
        self
    }

    pub fn pdf_ocr_fallback(mut self, policy: PdfOcrFallback) -> Self {
        self.config.pdf_ocr_fallback = policy;
        self
    }

    pub fn on_extraction_failure(mut self, policy: ExtractionFailurePolicy) -> Self {
        self.config.on_extraction_failure = policy;
        self
    }

    pub fn critical_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.critical_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn variants(mut self, variants: impl Into<Vec<SummaryVariant>>) -> Self {
        self.config.variants = variants.into();
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn ocr_max_retries(mut self, n: u32) -> Self {
        self.config.ocr_max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<MedLensConfig, MedLensError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(MedLensError::InvalidConfig(
                "Model identifier must not be empty".into(),
            ));
        }
        if c.variants.is_empty() {
            return Err(MedLensError::InvalidConfig(
                "At least one summary variant is required".into(),
            ));
        }
        if c.max_rendered_pixels < 100 {
            return Err(MedLensError::InvalidConfig(format!(
                "max_rendered_pixels must be at least 100, got {}",
                c.max_rendered_pixels
            )));
        }
        if !c.api_base_url.starts_with("http://") && !c.api_base_url.starts_with("https://") {
            return Err(MedLensError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How OCR is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OcrMode {
    /// No OCR; image uploads and scanned PDFs report the capability as unavailable.
    Disabled,
    /// Send page images to the configured vision-capable model. (default)
    #[default]
    Vision,
}

/// Whether a PDF without a text layer is rasterised and OCR'd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PdfOcrFallback {
    /// Try OCR as soon as the text layer comes back empty. (default)
    #[default]
    Automatic,
    /// Stop at the text layer; the caller can re-run with `Automatic` on request.
    Disabled,
}

/// How the pipeline treats an upload that produced no genuine text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtractionFailurePolicy {
    /// Embed the placeholder in the prompt and summarise it anyway. (default)
    ///
    /// The placeholder reaches the model but not the safety flagger: a
    /// failed extraction never raises the urgent-findings warning.
    #[default]
    Summarize,
    /// Return [`MedLensError::ExtractionAborted`] before any model call.
    Abort,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = MedLensConfig::default();
        assert_eq!(c.model, "models/gemini-2.0-flash");
        assert_eq!(c.critical_keywords.len(), 8);
        assert_eq!(c.variants, SummaryVariant::ALL.to_vec());
        assert_eq!(c.pdf_ocr_fallback, PdfOcrFallback::Automatic);
        assert_eq!(c.on_extraction_failure, ExtractionFailurePolicy::Summarize);
    }

    #[test]
    fn missing_credential_is_reported() {
        let c = MedLensConfig::builder().build().unwrap();
        assert!(!c.has_credential());
        assert!(matches!(
            c.require_credential(),
            Err(MedLensError::MissingCredential { .. })
        ));

        let c = MedLensConfig::builder().api_key("  ").build().unwrap();
        assert!(!c.has_credential());
    }

    #[test]
    fn build_rejects_empty_variants_and_model() {
        assert!(MedLensConfig::builder().variants(vec![]).build().is_err());
        assert!(MedLensConfig::builder().model("").build().is_err());
        assert!(MedLensConfig::builder().api_base_url("ftp://x").build().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = MedLensConfig::builder().api_key("secret-123").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-123"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn ocr_model_falls_back_to_model() {
        let c = MedLensConfig::builder().model("models/a").build().unwrap();
        assert_eq!(c.effective_ocr_model(), "models/a");
        let c = MedLensConfig::builder().ocr_model("models/b").build().unwrap();
        assert_eq!(c.effective_ocr_model(), "models/b");
    }
}
