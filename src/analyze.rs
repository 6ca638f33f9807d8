//! Eager (whole-report) analysis entry points.
//!
//! [`analyze`] runs extraction, flagging, prompt building and every
//! configured variant, and returns only when all variant calls are answered.
//! Use [`crate::stream::analyze_stream`] to receive variants one by one.

use crate::config::{ExtractionFailurePolicy, MedLensConfig, OcrMode};
use crate::error::MedLensError;
use crate::options::SummaryOptions;
use crate::output::{AnalysisReport, AnalysisStats, ExtractedText, InspectReport, UploadedDocument};
use crate::pipeline::extract::Extractor;
use crate::pipeline::input;
use crate::pipeline::llm::{GeminiBackend, GenerativeBackend, ProviderBackend};
use crate::pipeline::ocr::{OcrEngine, VisionOcr};
use crate::pipeline::prompt::{build_primary_prompt, PromptText};
use crate::pipeline::safety::SafetyFlagger;
use crate::pipeline::summarize::SummaryClient;
use edgequake_llm::ProviderFactory;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Summarise one uploaded report.
///
/// # Returns
/// `Ok(AnalysisReport)` even when extraction degraded to a placeholder or
/// some variant calls failed (check `report.stats.failed_variants`).
///
/// # Errors
/// Only fatal conditions:
/// - no credential / provider could not be created
/// - extraction produced no text and the policy is
///   [`ExtractionFailurePolicy::Abort`]
pub async fn analyze(
    document: &UploadedDocument,
    options: &SummaryOptions,
    config: &MedLensConfig,
) -> Result<AnalysisReport, MedLensError> {
    let total_start = Instant::now();
    info!("Analysing '{}' ({})", document.filename(), document.kind());

    // ── Step 1: Resolve backend ──────────────────────────────────────────
    let backend = resolve_backend(config)?;

    // ── Step 2: Extract + flag ───────────────────────────────────────────
    let prepared = prepare(document, options, config, Some(&backend)).await?;

    // ── Step 3: Summarise each variant, in order ─────────────────────────
    let client = SummaryClient::new(backend, config.model.as_str())
        .with_temperature(config.temperature);
    let llm_start = Instant::now();
    let mut summaries = Vec::with_capacity(config.variants.len());
    for &variant in &config.variants {
        if let Some(ref cb) = config.progress_callback {
            cb.on_variant_start(variant);
        }
        let result = client
            .summarize_variant(&prepared.prompt, variant, options)
            .await;
        if let Some(ref cb) = config.progress_callback {
            match &result.error {
                None => cb.on_variant_complete(variant, result.text.len()),
                Some(e) => cb.on_variant_error(variant, &e.to_string()),
            }
        }
        summaries.push(result);
    }
    let summarization_duration_ms = llm_start.elapsed().as_millis() as u64;

    // ── Step 4: Stats ────────────────────────────────────────────────────
    let failed_variants = summaries.iter().filter(|s| !s.is_ok()).count();
    let stats = AnalysisStats {
        extraction_duration_ms: prepared.extraction_duration_ms,
        summarization_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        failed_variants,
    };

    info!(
        "Analysis complete: {}/{} variants, {}ms total",
        summaries.len() - failed_variants,
        summaries.len(),
        stats.total_duration_ms
    );

    Ok(AnalysisReport {
        filename: document.filename().to_string(),
        kind: document.kind(),
        options: options.clone(),
        extracted: prepared.extracted,
        flagged: prepared.flagged,
        matched_keywords: prepared.matched_keywords,
        prompt: prepared.prompt,
        summaries,
        stats,
    })
}

/// Read `path` and [`analyze`] it.
pub async fn analyze_file(
    path: impl AsRef<Path>,
    options: &SummaryOptions,
    config: &MedLensConfig,
) -> Result<AnalysisReport, MedLensError> {
    let document = input::load_document(path).await?;
    analyze(&document, options, config).await
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    document: &UploadedDocument,
    options: &SummaryOptions,
    config: &MedLensConfig,
) -> Result<AnalysisReport, MedLensError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| MedLensError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(document, options, config))
}

/// Extract and flag without summarising.
///
/// Does not require a credential. When one is configured it is still used
/// for vision OCR, so scans and images are read the same way as in
/// [`analyze`].
pub async fn inspect(
    document: &UploadedDocument,
    config: &MedLensConfig,
) -> Result<InspectReport, MedLensError> {
    let backend = if config.has_credential() {
        Some(resolve_backend(config)?)
    } else {
        None
    };

    let start = Instant::now();
    let extracted = extract_with_progress(document, config, backend.as_ref()).await;
    let extraction_duration_ms = start.elapsed().as_millis() as u64;
    let (flagged, matched_keywords) = flag(&extracted, config);

    Ok(InspectReport {
        filename: document.filename().to_string(),
        kind: document.kind(),
        extracted,
        flagged,
        matched_keywords,
        extraction_duration_ms,
    })
}

/// Write the primary summary to `<dir>/<filename>.summary.txt`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_summary(
    report: &AnalysisReport,
    dir: impl AsRef<Path>,
) -> Result<PathBuf, MedLensError> {
    let artifact = report.summary_artifact();
    let dir = dir.as_ref();
    let path = dir.join(&artifact.file_name);
    let write_err = |source| MedLensError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(write_err)?;

    let tmp_path = dir.join(format!("{}.tmp", artifact.file_name));
    tokio::fs::write(&tmp_path, &artifact.bytes)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(write_err)?;

    debug!("Wrote {} bytes to {}", artifact.bytes.len(), path.display());
    Ok(path)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// The result of the stages before any summary call.
pub(crate) struct Prepared {
    pub extracted: ExtractedText,
    pub flagged: bool,
    pub matched_keywords: Vec<String>,
    pub prompt: PromptText,
    pub extraction_duration_ms: u64,
}

/// Extract, flag, build the primary prompt and apply the failure policy.
pub(crate) async fn prepare(
    document: &UploadedDocument,
    options: &SummaryOptions,
    config: &MedLensConfig,
    backend: Option<&Arc<dyn GenerativeBackend>>,
) -> Result<Prepared, MedLensError> {
    let start = Instant::now();
    let extracted = extract_with_progress(document, config, backend).await;
    let extraction_duration_ms = start.elapsed().as_millis() as u64;

    let (flagged, matched_keywords) = flag(&extracted, config);
    if flagged {
        warn!(
            "'{}' contains urgent-sounding terms: {}",
            document.filename(),
            matched_keywords.join(", ")
        );
    }

    if !extracted.is_ok() && config.on_extraction_failure == ExtractionFailurePolicy::Abort {
        return Err(MedLensError::ExtractionAborted {
            filename: document.filename().to_string(),
            reason: extracted
                .problem()
                .unwrap_or_else(|| "no readable text".to_string()),
        });
    }

    let prompt = build_primary_prompt(&extracted, document.filename(), options);
    debug!("Primary prompt: {} chars", prompt.as_str().len());

    Ok(Prepared {
        extracted,
        flagged,
        matched_keywords,
        prompt,
        extraction_duration_ms,
    })
}

async fn extract_with_progress(
    document: &UploadedDocument,
    config: &MedLensConfig,
    backend: Option<&Arc<dyn GenerativeBackend>>,
) -> ExtractedText {
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(document.filename());
    }
    let extracted = build_extractor(config, backend).extract(document).await;
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(extracted.status, extracted.char_count());
    }
    extracted
}

/// Only genuine text is flagged; a placeholder never raises the banner.
fn flag(extracted: &ExtractedText, config: &MedLensConfig) -> (bool, Vec<String>) {
    let Some(text) = extracted.text() else {
        return (false, Vec::new());
    };
    let flagger = SafetyFlagger::new(&config.critical_keywords);
    let matched: Vec<String> = flagger.matches(text).into_iter().map(String::from).collect();
    (!matched.is_empty(), matched)
}

/// OCR engine: an injected one wins; otherwise vision OCR through `backend`.
pub(crate) fn build_extractor(
    config: &MedLensConfig,
    backend: Option<&Arc<dyn GenerativeBackend>>,
) -> Extractor {
    let ocr: Option<Arc<dyn OcrEngine>> = match (&config.ocr_engine, config.ocr, backend) {
        (Some(engine), _, _) => Some(Arc::clone(engine)),
        (None, OcrMode::Vision, Some(backend)) => Some(Arc::new(
            VisionOcr::new(Arc::clone(backend), config.effective_ocr_model())
                .with_retries(config.ocr_max_retries, config.retry_backoff_ms),
        )),
        _ => None,
    };
    Extractor::new(ocr, config)
}

/// Backend name plus the models it reports. An empty list means the backend
/// has no listing endpoint.
pub async fn list_models(
    config: &MedLensConfig,
) -> Result<(String, Vec<String>), MedLensError> {
    let backend = resolve_backend(config)?;
    let name = backend.name().to_string();
    let models = backend
        .list_models()
        .await
        .map_err(|source| MedLensError::ModelListFailed {
            backend: name.clone(),
            source,
        })?;
    info!("{}: {} models listed", name, models.len());
    Ok((name, models))
}

/// Resolve the generative backend, from most-specific to least-specific.
///
/// 1. **Pre-built backend** (`config.backend`) used as-is; tests and hosts
///    with custom middleware.
/// 2. **Named provider** (`config.provider_name`) through
///    [`ProviderFactory::create_llm_provider`], which reads that provider's
///    own API key variable.
/// 3. **Gemini REST** with `config.api_key`.
pub(crate) fn resolve_backend(
    config: &MedLensConfig,
) -> Result<Arc<dyn GenerativeBackend>, MedLensError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .strip_prefix("models/")
            .unwrap_or(&config.model);
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            MedLensError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        })?;
        return Ok(Arc::new(ProviderBackend::new(provider, name.as_str())));
    }

    match config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => Ok(Arc::new(GeminiBackend::new(key, config.api_base_url.as_str()))),
        None => {
            config.require_credential()?;
            Err(MedLensError::Internal("no backend could be resolved".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PdfOcrFallback;
    use crate::output::DocumentKind;

    #[test]
    fn missing_credential_is_fatal() {
        let config = MedLensConfig::default();
        assert!(matches!(
            resolve_backend(&config),
            Err(MedLensError::MissingCredential { .. })
        ));
    }

    #[test]
    fn api_key_resolves_to_gemini() {
        let config = MedLensConfig::builder().api_key("k").build().unwrap();
        assert_eq!(resolve_backend(&config).unwrap().name(), "Gemini");
    }

    #[test]
    fn extractor_chain_follows_config() {
        let config = MedLensConfig::builder()
            .pdf_ocr_fallback(PdfOcrFallback::Disabled)
            .build()
            .unwrap();
        let extractor = build_extractor(&config, None);
        assert_eq!(extractor.strategies(DocumentKind::Pdf).len(), 1);
    }

    #[tokio::test]
    async fn inspect_needs_no_credential() {
        let doc = UploadedDocument::new("labs.txt", "Findings: acute fracture of radius.");
        let report = inspect(&doc, &MedLensConfig::default()).await.unwrap();
        assert!(report.flagged);
        assert_eq!(report.matched_keywords, vec!["acute", "fracture"]);
        assert_eq!(report.kind, DocumentKind::Text);
    }

    #[tokio::test]
    async fn placeholder_never_flags() {
        // The OCR-unavailable message must not trip "critical" etc.
        let doc = UploadedDocument::new("urgent-critical.png", vec![1u8, 2, 3]);
        let config = MedLensConfig::builder()
            .critical_keywords(["image", "decoded", "ocr"])
            .build()
            .unwrap();
        let report = inspect(&doc, &config).await.unwrap();
        assert!(!report.extracted.is_ok());
        assert!(!report.flagged);
    }

    #[tokio::test]
    async fn model_listing_reports_backend_and_failures() {
        use crate::error::GenerationError;
        use crate::pipeline::llm::GenerationRequest;
        use async_trait::async_trait;
        use serde_json::Value;

        struct Listing(Result<Vec<String>, GenerationError>);

        #[async_trait]
        impl GenerativeBackend for Listing {
            fn name(&self) -> &str {
                "Fake"
            }

            async fn generate(&self, _: &GenerationRequest) -> Result<Value, GenerationError> {
                Err(GenerationError::EmptyResponse)
            }

            async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
                self.0.clone()
            }
        }

        let ok = MedLensConfig::builder()
            .backend(Arc::new(Listing(Ok(vec!["models/a".into()]))))
            .build()
            .unwrap();
        let (name, models) = list_models(&ok).await.unwrap();
        assert_eq!(name, "Fake");
        assert_eq!(models, vec!["models/a"]);

        let failing = MedLensConfig::builder()
            .backend(Arc::new(Listing(Err(GenerationError::Status {
                status: 403,
                detail: "denied".into(),
            }))))
            .build()
            .unwrap();
        assert!(matches!(
            list_models(&failing).await,
            Err(MedLensError::ModelListFailed { .. })
        ));

        assert!(matches!(
            list_models(&MedLensConfig::default()).await,
            Err(MedLensError::MissingCredential { .. })
        ));
    }
}
