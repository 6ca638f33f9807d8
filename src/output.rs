//! Value types flowing through one upload-and-summarise cycle.
//!
//! Nothing here outlives a single request: an [`UploadedDocument`] goes in,
//! an [`AnalysisReport`] comes out, and both are dropped once the caller has
//! displayed or saved the summary.

use crate::error::{ExtractionFailure, GenerationError};
use crate::options::{SummaryOptions, SummaryVariant};
use crate::pipeline::extract::ExtractionStrategy;
use crate::pipeline::prompt::PromptText;
use crate::prompts::NO_READABLE_TEXT;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Input ────────────────────────────────────────────────────────────────

/// File kind declared by the upload's filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Pdf,
    Image,
    Text,
    /// Any other extension. Extracted like an image (best-effort OCR).
    Unknown,
}

impl DocumentKind {
    /// Classify by extension, case-insensitively. No content sniffing.
    pub fn from_filename(filename: &str) -> Self {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => DocumentKind::Pdf,
            "txt" => DocumentKind::Text,
            "png" | "jpg" | "jpeg" => DocumentKind::Image,
            _ => DocumentKind::Unknown,
        }
    }

    /// Whether the extension is one of the advertised upload types.
    pub fn is_supported(self) -> bool {
        !matches!(self, DocumentKind::Unknown)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Image => "image",
            DocumentKind::Text => "text",
            DocumentKind::Unknown => "unknown",
        })
    }
}

/// An uploaded report: original filename plus raw bytes. Immutable.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    filename: String,
    bytes: Vec<u8>,
    kind: DocumentKind,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let filename = filename.into();
        let kind = DocumentKind::from_filename(&filename);
        Self {
            filename,
            bytes: bytes.into(),
            kind,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }
}

// ── Extraction ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionStatus {
    Ok,
    /// Extraction ran but produced only whitespace.
    Empty,
    /// No strategy could run to completion; see [`ExtractedText::failure`].
    ExtractionError,
}

/// Text pulled out of an upload.
///
/// `content` always holds something printable: the real text when
/// `status == Ok`, otherwise a bracketed placeholder. Use [`Self::text`] to
/// get only genuine text and [`Self::failure`] for the structured reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub status: ExtractionStatus,
    pub content: String,
    pub failure: Option<ExtractionFailure>,
    /// The strategy that produced `content` (only for `Ok`).
    pub strategy: Option<ExtractionStrategy>,
}

impl ExtractedText {
    pub fn ok(content: impl Into<String>, strategy: ExtractionStrategy) -> Self {
        Self {
            status: ExtractionStatus::Ok,
            content: content.into(),
            failure: None,
            strategy: Some(strategy),
        }
    }

    pub fn empty() -> Self {
        Self {
            status: ExtractionStatus::Empty,
            content: NO_READABLE_TEXT.to_string(),
            failure: None,
            strategy: None,
        }
    }

    pub fn failed(failure: ExtractionFailure) -> Self {
        Self {
            status: ExtractionStatus::ExtractionError,
            content: failure.sentinel(),
            failure: Some(failure),
            strategy: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ExtractionStatus::Ok
    }

    /// The genuine extracted text, or `None` when `content` is a placeholder.
    pub fn text(&self) -> Option<&str> {
        self.is_ok().then_some(self.content.as_str())
    }

    pub fn failure(&self) -> Option<&ExtractionFailure> {
        self.failure.as_ref()
    }

    /// Human-readable reason when the status is not `Ok`.
    pub fn problem(&self) -> Option<String> {
        match self.status {
            ExtractionStatus::Ok => None,
            ExtractionStatus::Empty => Some("no readable text".to_string()),
            ExtractionStatus::ExtractionError => self.failure.as_ref().map(|f| f.message.clone()),
        }
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// At most `limit` characters of `content`, marked when cut.
    pub fn preview(&self, limit: usize) -> String {
        match self.content.char_indices().nth(limit) {
            Some((cut, _)) => format!("{}\n\n...[truncated]", &self.content[..cut]),
            None => self.content.clone(),
        }
    }
}

// ── Summaries ────────────────────────────────────────────────────────────

/// The outcome of one variant call.
///
/// `text` is always displayable. When the call failed, `text` is a
/// placeholder and `error` carries the structured reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub variant: SummaryVariant,
    pub text: String,
    pub error: Option<GenerationError>,
    pub duration_ms: u64,
}

impl SummaryResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Timing for one [`crate::analyze`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub extraction_duration_ms: u64,
    pub summarization_duration_ms: u64,
    pub total_duration_ms: u64,
    pub failed_variants: usize,
}

/// Everything produced for one upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub filename: String,
    pub kind: DocumentKind,
    pub options: SummaryOptions,
    pub extracted: ExtractedText,
    /// Whether the extracted text contains any critical keyword.
    pub flagged: bool,
    pub matched_keywords: Vec<String>,
    /// The primary (patient) prompt; variant prompts extend it.
    pub prompt: PromptText,
    /// One entry per requested variant, in request order.
    pub summaries: Vec<SummaryResult>,
    pub stats: AnalysisStats,
}

impl AnalysisReport {
    pub fn summary(&self, variant: SummaryVariant) -> Option<&SummaryResult> {
        self.summaries.iter().find(|s| s.variant == variant)
    }

    /// The first summary produced, normally the patient-friendly one.
    pub fn primary_summary(&self) -> Option<&SummaryResult> {
        self.summary(SummaryVariant::Patient)
            .or_else(|| self.summaries.first())
    }

    /// The downloadable plain-text artifact for the primary summary.
    pub fn summary_artifact(&self) -> SummaryArtifact {
        let text = self
            .primary_summary()
            .map(|s| s.text.as_str())
            .unwrap_or_default();
        SummaryArtifact::new(&self.filename, text)
    }
}

/// Extraction and flagging only, as returned by [`crate::inspect`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectReport {
    pub filename: String,
    pub kind: DocumentKind,
    pub extracted: ExtractedText,
    pub flagged: bool,
    pub matched_keywords: Vec<String>,
    pub extraction_duration_ms: u64,
}

/// `<originalFilename>.summary.txt` holding the primary summary as UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SummaryArtifact {
    pub fn new(original_filename: &str, summary: &str) -> Self {
        // Only the final path component; an upload name must not pick the
        // directory the artifact lands in.
        let base = original_filename
            .rsplit(['/', '\\'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("report");
        Self {
            file_name: format!("{base}.summary.txt"),
            bytes: summary.as_bytes().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension_is_case_insensitive() {
        assert_eq!(DocumentKind::from_filename("Report.PDF"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_filename("notes.txt"), DocumentKind::Text);
        assert_eq!(DocumentKind::from_filename("scan.JPeG"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_filename("scan.png"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_filename("scan.tiff"), DocumentKind::Unknown);
        assert_eq!(DocumentKind::from_filename("README"), DocumentKind::Unknown);
    }

    #[test]
    fn empty_and_failed_carry_placeholders() {
        let e = ExtractedText::empty();
        assert_eq!(e.text(), None);
        assert!(e.content.contains("No readable text"));

        let f = ExtractedText::failed(ExtractionFailure::malformed("PDF is corrupt"));
        assert_eq!(f.status, ExtractionStatus::ExtractionError);
        assert_eq!(f.content, "[PDF is corrupt]");
        assert_eq!(f.problem().as_deref(), Some("PDF is corrupt"));
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let t = ExtractedText::ok("héllo wörld", ExtractionStrategy::Utf8Decode);
        assert_eq!(t.preview(5), "héllo\n\n...[truncated]");
        assert_eq!(t.preview(100), "héllo wörld");
    }

    #[test]
    fn artifact_name_uses_basename() {
        let a = SummaryArtifact::new("report.pdf", "All clear.");
        assert_eq!(a.file_name, "report.pdf.summary.txt");
        assert_eq!(a.bytes, b"All clear.");

        let a = SummaryArtifact::new("../../etc/labs.txt", "x");
        assert_eq!(a.file_name, "labs.txt.summary.txt");
    }
}
