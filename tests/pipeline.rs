//! Offline integration tests for the full analysis pipeline.
//!
//! A scripted `GenerativeBackend` stands in for the model and a scripted
//! `OcrEngine` for OCR, so these run without network access or pdfium.

use async_trait::async_trait;
use futures::StreamExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use medlens::{
    analyze, analyze_file, analyze_stream, inspect, write_summary, AnalysisProgressCallback,
    ExtractionFailure, ExtractionFailurePolicy, ExtractionStatus, ExtractionStrategy,
    GenerationError, GenerationRequest, GenerativeBackend, Language, MedLensConfig, MedLensError,
    OcrEngine, SummaryOptions, SummaryVariant, UploadedDocument, MAX_REPORT_CHARS,
};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

enum Reply {
    /// Gemini `candidates` shape, echoing the variant index.
    Candidates,
    /// Direct `{"text": …}` shape.
    Text(&'static str),
    Fail(GenerationError),
}

struct FakeBackend {
    reply: Reply,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeBackend {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            requests: Mutex::new(vec![]),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }
}

#[async_trait]
impl GenerativeBackend for FakeBackend {
    fn name(&self) -> &str {
        "Fake"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        match &self.reply {
            Reply::Candidates => Ok(json!({
                "candidates": [{ "content": { "parts": [{ "text": format!("summary #{n}\n") }] } }]
            })),
            Reply::Text(t) => Ok(json!({ "text": t })),
            Reply::Fail(e) => Err(e.clone()),
        }
    }
}

struct FakeOcr {
    text: &'static str,
    channels: Mutex<Vec<u8>>,
}

#[async_trait]
impl OcrEngine for FakeOcr {
    fn name(&self) -> &str {
        "fake-ocr"
    }

    async fn recognize(&self, image: &DynamicImage) -> Result<String, ExtractionFailure> {
        self.channels
            .lock()
            .unwrap()
            .push(image.color().channel_count());
        Ok(self.text.to_string())
    }
}

#[derive(Default)]
struct Events(Mutex<Vec<String>>);

impl AnalysisProgressCallback for Events {
    fn on_extraction_start(&self, filename: &str) {
        self.0.lock().unwrap().push(format!("extract:{filename}"));
    }
    fn on_extraction_complete(&self, status: ExtractionStatus, _char_count: usize) {
        self.0.lock().unwrap().push(format!("extracted:{status:?}"));
    }
    fn on_variant_start(&self, variant: SummaryVariant) {
        self.0.lock().unwrap().push(format!("start:{variant}"));
    }
    fn on_variant_complete(&self, variant: SummaryVariant, _len: usize) {
        self.0.lock().unwrap().push(format!("done:{variant}"));
    }
    fn on_variant_error(&self, variant: SummaryVariant, _error: &str) {
        self.0.lock().unwrap().push(format!("error:{variant}"));
    }
}

fn config_with(backend: Arc<FakeBackend>) -> MedLensConfig {
    MedLensConfig::builder()
        .backend(backend)
        .build()
        .unwrap()
}

fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([10, 120, 200])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

const URGENT: &str = "Patient has acute bleeding, needs urgent care.";

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn urgent_text_report_is_flagged_and_embedded() {
    let backend = FakeBackend::new(Reply::Candidates);
    let doc = UploadedDocument::new("report.txt", URGENT);

    let report = analyze(&doc, &SummaryOptions::default(), &config_with(backend.clone()))
        .await
        .unwrap();

    assert!(report.flagged);
    assert_eq!(report.matched_keywords, vec!["urgent", "acute", "bleeding"]);
    assert_eq!(report.extracted.text(), Some(URGENT));
    assert_eq!(report.extracted.strategy, Some(ExtractionStrategy::Utf8Decode));

    let prompts = backend.prompts();
    assert!(prompts[0].contains(URGENT));
    assert!(prompts[0].contains("bullet points"));
    assert!(prompts[0].contains("Filename: report.txt"));
}

#[tokio::test]
async fn variants_run_in_order_and_extend_the_primary_prompt() {
    let backend = FakeBackend::new(Reply::Candidates);
    let doc = UploadedDocument::new("labs.txt", "Hb 9.1 g/dL (low)");

    let report = analyze(&doc, &SummaryOptions::default(), &config_with(backend.clone()))
        .await
        .unwrap();

    let order: Vec<_> = report.summaries.iter().map(|s| s.variant).collect();
    assert_eq!(order, SummaryVariant::ALL.to_vec());
    assert_eq!(report.summaries[0].text, "summary #1");
    assert_eq!(report.summaries[2].text, "summary #3");
    assert_eq!(report.stats.failed_variants, 0);

    let prompts = backend.prompts();
    assert_eq!(prompts.len(), 3);
    assert_eq!(prompts[0], report.prompt.as_str());
    for (prompt, variant) in prompts.iter().zip(SummaryVariant::ALL) {
        assert!(prompt.starts_with(&prompts[0]));
        assert!(prompt.ends_with(variant.instruction_suffix()));
    }

    let hints: Vec<_> = backend
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.max_output_tokens)
        .collect();
    assert_eq!(hints, vec![Some(300), Some(220), Some(120)]);
}

#[tokio::test]
async fn zero_byte_pdf_still_builds_a_prompt() {
    let backend = FakeBackend::new(Reply::Text("Nothing to summarise."));
    let doc = UploadedDocument::new("empty.pdf", Vec::<u8>::new());

    let report = analyze(&doc, &SummaryOptions::default(), &config_with(backend.clone()))
        .await
        .unwrap();

    assert_eq!(report.extracted.status, ExtractionStatus::Empty);
    assert!(report.extracted.content.contains("No readable text"));
    assert!(!report.flagged);
    assert!(backend.prompts()[0].contains(&report.extracted.content));
    assert_eq!(report.summaries[0].text, "Nothing to summarise.");
}

#[tokio::test]
async fn abort_policy_stops_before_any_model_call() {
    let backend = FakeBackend::new(Reply::Candidates);
    let config = MedLensConfig::builder()
        .backend(backend.clone())
        .on_extraction_failure(ExtractionFailurePolicy::Abort)
        .build()
        .unwrap();
    let doc = UploadedDocument::new("empty.pdf", Vec::<u8>::new());

    let err = analyze(&doc, &SummaryOptions::default(), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, MedLensError::ExtractionAborted { .. }), "{err}");
    assert!(backend.prompts().is_empty());
}

#[tokio::test]
async fn failed_model_calls_become_placeholders() {
    let backend = FakeBackend::new(Reply::Fail(GenerationError::Status {
        status: 429,
        detail: "quota exceeded".into(),
    }));
    let doc = UploadedDocument::new("labs.txt", "TSH 2.1 mIU/L");

    let report = analyze(&doc, &SummaryOptions::default(), &config_with(backend))
        .await
        .unwrap();

    assert_eq!(report.stats.failed_variants, 3);
    for s in &report.summaries {
        assert!(s.text.starts_with("[Error from Fake API:"), "{}", s.text);
        assert!(s.text.contains("quota exceeded"));
        assert!(matches!(s.error, Some(GenerationError::Status { status: 429, .. })));
    }
}

#[tokio::test]
async fn empty_model_response_is_no_output_placeholder() {
    let backend = FakeBackend::new(Reply::Text("   "));
    let doc = UploadedDocument::new("labs.txt", "TSH 2.1 mIU/L");
    let report = analyze(&doc, &SummaryOptions::default(), &config_with(backend))
        .await
        .unwrap();
    assert_eq!(report.summaries[0].text, "[No output from model]");
    assert_eq!(report.summaries[0].error, Some(GenerationError::EmptyResponse));
}

#[tokio::test]
async fn hindi_prompt_carries_translation_clause() {
    let backend = FakeBackend::new(Reply::Candidates);
    let doc = UploadedDocument::new("labs.txt", "Vitamin D 12 ng/mL");
    let options = SummaryOptions::default().language(Language::Hindi);

    analyze(&doc, &options, &config_with(backend.clone()))
        .await
        .unwrap();

    assert!(backend.prompts().iter().all(|p| p.contains("Translate")));
}

#[tokio::test]
async fn long_report_is_truncated_in_prompt() {
    let backend = FakeBackend::new(Reply::Candidates);
    let body = "x".repeat(MAX_REPORT_CHARS + 1234);
    let doc = UploadedDocument::new("long.txt", body);

    let report = analyze(&doc, &SummaryOptions::default(), &config_with(backend))
        .await
        .unwrap();

    assert!(report.prompt.was_truncated());
    assert_eq!(report.prompt.report_segment().len(), MAX_REPORT_CHARS);
    assert_eq!(report.extracted.char_count(), MAX_REPORT_CHARS + 1234);
}

#[tokio::test]
async fn image_goes_through_grayscale_ocr() {
    let backend = FakeBackend::new(Reply::Candidates);
    let ocr = Arc::new(FakeOcr {
        text: "  CT head: acute infarct, left MCA territory. \n",
        channels: Mutex::new(vec![]),
    });
    let config = MedLensConfig::builder()
        .backend(backend.clone())
        .ocr_engine(ocr.clone())
        .build()
        .unwrap();
    let doc = UploadedDocument::new("scan.JPG", png_bytes());

    let report = analyze(&doc, &SummaryOptions::default(), &config)
        .await
        .unwrap();

    assert_eq!(
        report.extracted.text(),
        Some("CT head: acute infarct, left MCA territory.")
    );
    assert_eq!(report.extracted.strategy, Some(ExtractionStrategy::ImageOcr));
    assert!(report.flagged);
    assert_eq!(*ocr.channels.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn unknown_extension_is_treated_as_image() {
    let ocr = Arc::new(FakeOcr {
        text: "referral letter",
        channels: Mutex::new(vec![]),
    });
    let config = MedLensConfig::builder().ocr_engine(ocr).build().unwrap();
    let doc = UploadedDocument::new("fax.tiff", png_bytes());

    let report = inspect(&doc, &config).await.unwrap();
    assert_eq!(report.extracted.text(), Some("referral letter"));
}

#[tokio::test]
async fn corrupt_image_is_a_placeholder_not_an_error() {
    let backend = FakeBackend::new(Reply::Candidates);
    let doc = UploadedDocument::new("photo.png", b"\x89PNG\r\n\x1a\ntruncated".to_vec());

    let report = analyze(&doc, &SummaryOptions::default(), &config_with(backend.clone()))
        .await
        .unwrap();

    assert_eq!(report.extracted.status, ExtractionStatus::ExtractionError);
    assert_eq!(
        report.extracted.failure().map(|f| f.kind),
        Some(medlens::FailureKind::MalformedInput)
    );
    // The placeholder is summarised like text.
    assert!(backend.prompts()[0].contains(&report.extracted.content));
}

#[tokio::test]
async fn progress_events_follow_pipeline_order() {
    let backend = FakeBackend::new(Reply::Candidates);
    let events = Arc::new(Events::default());
    let config = MedLensConfig::builder()
        .backend(backend)
        .variants(vec![SummaryVariant::Patient, SummaryVariant::NextSteps])
        .progress_callback(events.clone())
        .build()
        .unwrap();
    let doc = UploadedDocument::new("r.txt", "ok");

    analyze(&doc, &SummaryOptions::default(), &config)
        .await
        .unwrap();

    assert_eq!(
        *events.0.lock().unwrap(),
        vec![
            "extract:r.txt",
            "extracted:Ok",
            "start:patient",
            "done:patient",
            "start:next-steps",
            "done:next-steps",
        ]
    );
}

#[tokio::test]
async fn stream_yields_variants_in_order() {
    let backend = FakeBackend::new(Reply::Candidates);
    let doc = UploadedDocument::new("r.txt", URGENT);

    let config = config_with(backend.clone());
    let mut analysis = analyze_stream(&doc, &SummaryOptions::default(), &config)
        .await
        .unwrap();
    assert!(analysis.flagged);
    // Nothing is requested until the stream is polled.
    assert!(backend.prompts().is_empty());

    let mut seen = Vec::new();
    while let Some(result) = analysis.variants.next().await {
        seen.push((result.variant, result.text));
    }
    assert_eq!(
        seen,
        vec![
            (SummaryVariant::Patient, "summary #1".to_string()),
            (SummaryVariant::Clinician, "summary #2".to_string()),
            (SummaryVariant::NextSteps, "summary #3".to_string()),
        ]
    );
}

#[tokio::test]
async fn missing_credential_is_fatal_for_analysis() {
    let doc = UploadedDocument::new("r.txt", "ok");
    let err = analyze(&doc, &SummaryOptions::default(), &MedLensConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MedLensError::MissingCredential { .. }));
}

#[tokio::test]
async fn summary_artifact_is_written_atomically() {
    let backend = FakeBackend::new(Reply::Text("Your results are normal."));
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("blood_test.txt");
    std::fs::write(&input, "All values within range.").unwrap();

    let report = analyze_file(&input, &SummaryOptions::default(), &config_with(backend))
        .await
        .unwrap();
    let out_dir = dir.path().join("out");
    let path = write_summary(&report, &out_dir).await.unwrap();

    assert_eq!(path.file_name().unwrap(), "blood_test.txt.summary.txt");
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "Your results are normal."
    );
    assert!(!out_dir.join("blood_test.txt.summary.txt.tmp").exists());
}

#[tokio::test]
async fn missing_file_is_fatal() {
    let backend = FakeBackend::new(Reply::Candidates);
    let err = analyze_file(
        "/no/such/report.pdf",
        &SummaryOptions::default(),
        &config_with(backend),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, MedLensError::FileNotFound { .. }));
}
