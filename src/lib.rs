//! # medlens
//!
//! Turn a medical report (PDF, scanned image or plain text) into a short,
//! patient-friendly summary using a generative model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Input     read bytes, classify by extension
//!  ├─ 2. Extract   pdf text layer → page OCR, image OCR, or UTF-8 decode
//!  ├─ 3. Flag      critical-keyword scan (informational banner only)
//!  ├─ 4. Prompt    tone / persona / language template + report (≤ 30 000 chars)
//!  ├─ 5. Summarise one model call per variant: patient, clinician, next steps
//!  └─ 6. Output    displayable text per variant + `<file>.summary.txt`
//! ```
//!
//! Nothing after the upload aborts the request by default: an unreadable
//! file becomes a bracketed placeholder that is summarised like any other
//! text, and a failed model call becomes a placeholder summary. Both carry a
//! structured reason alongside the text ([`ExtractedText::failure`],
//! [`SummaryResult::error`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medlens::{analyze_file, Language, MedLensConfig, SummaryOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // GOOGLE_API_KEY (or MEDLENS_PROVIDER) must be set.
//!     let config = MedLensConfig::from_env()?;
//!     let options = SummaryOptions::default().language(Language::Hindi);
//!     let report = analyze_file("blood_test.pdf", &options, &config).await?;
//!     if report.flagged {
//!         eprintln!("⚠ urgent-sounding terms: {:?}", report.matched_keywords);
//!     }
//!     for summary in &report.summaries {
//!         println!("## {}\n{}\n", summary.variant.title(), summary.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `medlens` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! medlens = { version = "0.3", default-features = false }
//! ```
//!
//! ## Optional engines
//!
//! PDF reading needs the pdfium shared library (system path or
//! `PDFIUM_LIB_PATH`). OCR of scans and photos uses the configured model's
//! vision input unless an [`OcrEngine`] is injected. Without either, the
//! affected uploads come back as placeholders instead of errors.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_file, analyze_sync, inspect, list_models, write_summary};
pub use config::{
    ExtractionFailurePolicy, MedLensConfig, MedLensConfigBuilder, OcrMode, PdfOcrFallback,
};
pub use error::{ExtractionFailure, FailureKind, GenerationError, MedLensError};
pub use options::{Language, SummaryOptions, SummaryVariant, Tone};
pub use output::{
    AnalysisReport, AnalysisStats, DocumentKind, ExtractedText, ExtractionStatus, InspectReport,
    SummaryArtifact, SummaryResult, UploadedDocument,
};
pub use pipeline::extract::{ExtractionStrategy, Extractor};
pub use pipeline::input::load_document;
pub use pipeline::llm::{GeminiBackend, GenerationRequest, GenerativeBackend, ProviderBackend};
pub use pipeline::ocr::{OcrEngine, VisionOcr};
pub use pipeline::prompt::{build_primary_prompt, build_prompt, PromptText, MAX_REPORT_CHARS};
pub use pipeline::safety::SafetyFlagger;
pub use pipeline::summarize::SummaryClient;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{analyze_stream, analyze_stream_file, AnalysisStream, VariantStream};
