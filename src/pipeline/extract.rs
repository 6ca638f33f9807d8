//! Text extraction: an ordered chain of strategies per document kind.
//!
//! | Kind            | Chain                                   |
//! |-----------------|-----------------------------------------|
//! | PDF             | text layer → page OCR (if fallback on)  |
//! | Image / Unknown | image OCR                               |
//! | Text            | lossy UTF-8 decode                      |
//!
//! Each strategy answers with a tri-state [`StrategyOutcome`]. The chain
//! moves on only after `Empty` or `Unavailable`; the first `Success` wins
//! and nothing after it runs. [`resolve_attempts`] folds the attempts into
//! one [`ExtractedText`].
//!
//! Extraction never returns `Err`: a missing engine or an unreadable file
//! becomes a placeholder inside `ExtractedText` with its structured
//! [`ExtractionFailure`] attached.

use crate::config::{MedLensConfig, PdfOcrFallback};
use crate::error::ExtractionFailure;
use crate::output::{DocumentKind, ExtractedText, UploadedDocument};
use crate::pipeline::{encode, ocr::OcrEngine, pdf};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One way of turning bytes into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionStrategy {
    /// pdfium's native text layer.
    PdfTextLayer,
    /// Rasterise each PDF page and OCR it.
    PdfOcr,
    /// Decode an image, grayscale it, OCR it.
    ImageOcr,
    /// Lossy UTF-8 decode.
    Utf8Decode,
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExtractionStrategy::PdfTextLayer => "pdf-text-layer",
            ExtractionStrategy::PdfOcr => "pdf-ocr",
            ExtractionStrategy::ImageOcr => "image-ocr",
            ExtractionStrategy::Utf8Decode => "utf8-decode",
        })
    }
}

/// Result of running a single strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    Success(String),
    /// Ran fine, found only whitespace.
    Empty,
    /// Could not run to completion: engine missing, input malformed, engine error.
    Unavailable(ExtractionFailure),
}

impl StrategyOutcome {
    /// `Success` for text with non-whitespace content, `Empty` otherwise.
    fn from_text(text: String) -> Self {
        if text.trim().is_empty() {
            StrategyOutcome::Empty
        } else {
            StrategyOutcome::Success(text)
        }
    }
}

/// Converts uploads into [`ExtractedText`].
#[derive(Clone)]
pub struct Extractor {
    ocr: Option<Arc<dyn OcrEngine>>,
    pdf_ocr_fallback: PdfOcrFallback,
    max_rendered_pixels: u32,
}

impl Extractor {
    /// `ocr = None` means OCR strategies report the capability as unavailable.
    pub fn new(ocr: Option<Arc<dyn OcrEngine>>, config: &MedLensConfig) -> Self {
        Self {
            ocr,
            pdf_ocr_fallback: config.pdf_ocr_fallback,
            max_rendered_pixels: config.max_rendered_pixels,
        }
    }

    /// The ordered strategy chain for `kind`.
    pub fn strategies(&self, kind: DocumentKind) -> Vec<ExtractionStrategy> {
        match kind {
            DocumentKind::Pdf => match self.pdf_ocr_fallback {
                PdfOcrFallback::Automatic => vec![
                    ExtractionStrategy::PdfTextLayer,
                    ExtractionStrategy::PdfOcr,
                ],
                PdfOcrFallback::Disabled => vec![ExtractionStrategy::PdfTextLayer],
            },
            DocumentKind::Text => vec![ExtractionStrategy::Utf8Decode],
            DocumentKind::Image | DocumentKind::Unknown => vec![ExtractionStrategy::ImageOcr],
        }
    }

    pub async fn extract(&self, document: &UploadedDocument) -> ExtractedText {
        self.extract_bytes(document.bytes(), document.kind()).await
    }

    /// Extract text from raw bytes of a declared kind. Never fails.
    pub async fn extract_bytes(&self, bytes: &[u8], kind: DocumentKind) -> ExtractedText {
        if bytes.is_empty() {
            debug!("Zero-byte {} upload; nothing to extract", kind);
            return ExtractedText::empty();
        }

        let mut attempts = Vec::new();
        for strategy in self.strategies(kind) {
            let outcome = self.run(strategy, bytes).await;
            match &outcome {
                StrategyOutcome::Success(text) => {
                    info!("{}: extracted {} chars", strategy, text.chars().count());
                }
                StrategyOutcome::Empty => info!("{}: no text", strategy),
                StrategyOutcome::Unavailable(f) => warn!("{}: {}", strategy, f),
            }
            let done = matches!(outcome, StrategyOutcome::Success(_));
            attempts.push((strategy, outcome));
            if done {
                break;
            }
        }

        resolve_attempts(attempts)
    }

    async fn run(&self, strategy: ExtractionStrategy, bytes: &[u8]) -> StrategyOutcome {
        match strategy {
            ExtractionStrategy::Utf8Decode => {
                StrategyOutcome::from_text(String::from_utf8_lossy(bytes).into_owned())
            }
            ExtractionStrategy::PdfTextLayer => match pdf::extract_text_layer(bytes.to_vec()).await
            {
                Ok(text) => StrategyOutcome::from_text(text),
                Err(f) => StrategyOutcome::Unavailable(f),
            },
            ExtractionStrategy::PdfOcr => self.ocr_pdf(bytes).await,
            ExtractionStrategy::ImageOcr => self.ocr_image(bytes).await,
        }
    }

    fn ocr_engine(&self) -> Result<&Arc<dyn OcrEngine>, ExtractionFailure> {
        self.ocr.as_ref().ok_or_else(|| {
            ExtractionFailure::unavailable(
                "OCR engine not available; configure a vision-capable model to read scans and images",
            )
        })
    }

    async fn ocr_image(&self, bytes: &[u8]) -> StrategyOutcome {
        let image = match encode::decode_image(bytes) {
            Ok(img) => encode::to_grayscale(&img),
            Err(e) => {
                return StrategyOutcome::Unavailable(ExtractionFailure::malformed(format!(
                    "Image could not be decoded: {e}"
                )))
            }
        };
        let engine = match self.ocr_engine() {
            Ok(engine) => engine,
            Err(f) => return StrategyOutcome::Unavailable(f),
        };
        match engine.recognize(&image).await {
            Ok(text) => StrategyOutcome::from_text(text.trim().to_string()),
            Err(f) => StrategyOutcome::Unavailable(f),
        }
    }

    async fn ocr_pdf(&self, bytes: &[u8]) -> StrategyOutcome {
        let engine = match self.ocr_engine() {
            Ok(engine) => engine,
            Err(f) => return StrategyOutcome::Unavailable(f),
        };
        let pages = match pdf::render_pages(bytes.to_vec(), self.max_rendered_pixels).await {
            Ok(pages) => pages,
            Err(f) => return StrategyOutcome::Unavailable(f),
        };

        let mut texts = Vec::with_capacity(pages.len());
        let mut failed = 0usize;
        let mut last_error = None;
        for (idx, page) in pages.iter().enumerate() {
            let gray = encode::to_grayscale(page);
            match engine.recognize(&gray).await {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        texts.push(text.to_string());
                    }
                }
                Err(f) => {
                    warn!("OCR of page {} failed: {}", idx + 1, f);
                    failed += 1;
                    last_error = Some(f);
                }
            }
        }

        // A partial read is still a read; only a total loss is a failure.
        match last_error {
            Some(f) if failed == pages.len() => StrategyOutcome::Unavailable(f),
            _ => StrategyOutcome::from_text(texts.join("\n\n")),
        }
    }
}

/// Fold strategy attempts into the final [`ExtractedText`].
///
/// * any `Success` → `Ok` with that text;
/// * otherwise, any `Unavailable` → `ExtractionError` carrying the last
///   failure, prefixed with "No readable text found" when an earlier
///   strategy ran and came back empty;
/// * otherwise → `Empty`.
pub fn resolve_attempts(attempts: Vec<(ExtractionStrategy, StrategyOutcome)>) -> ExtractedText {
    let mut saw_empty = false;
    let mut last_failure = None;

    for (strategy, outcome) in attempts {
        match outcome {
            StrategyOutcome::Success(text) => return ExtractedText::ok(text, strategy),
            StrategyOutcome::Empty => saw_empty = true,
            StrategyOutcome::Unavailable(f) => last_failure = Some(f),
        }
    }

    match last_failure {
        Some(f) if saw_empty => ExtractedText::failed(ExtractionFailure {
            kind: f.kind,
            message: format!("No readable text found; {}", f.message),
        }),
        Some(f) => ExtractedText::failed(f),
        None => ExtractedText::empty(),
    }
}
