//! Streaming analysis API: emit each summary variant as it is answered.
//!
//! Unlike the eager [`crate::analyze::analyze`], which returns only after
//! every variant call finishes, [`analyze_stream`] does extraction and
//! prompt building up front and hands back a `Stream` of
//! [`SummaryResult`]s. Variants are requested one at a time, in configured
//! order, and each call is made only when the stream is polled for it.

use crate::analyze::{prepare, resolve_backend};
use crate::config::MedLensConfig;
use crate::error::MedLensError;
use crate::options::SummaryOptions;
use crate::output::{ExtractedText, SummaryResult, UploadedDocument};
use crate::pipeline::input;
use crate::pipeline::prompt::PromptText;
use crate::pipeline::summarize::SummaryClient;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of variant results.
pub type VariantStream = Pin<Box<dyn Stream<Item = SummaryResult> + Send>>;

/// Extraction output plus the pending variant calls.
pub struct AnalysisStream {
    pub extracted: ExtractedText,
    pub flagged: bool,
    pub matched_keywords: Vec<String>,
    pub prompt: PromptText,
    pub variants: VariantStream,
}

/// Analyse `document`, streaming variant summaries as they complete.
///
/// # Returns
/// - `Ok(AnalysisStream)`: extracted text, flag, prompt and the variant stream
/// - `Err(MedLensError)`: fatal error (no credential, extraction aborted)
pub async fn analyze_stream(
    document: &UploadedDocument,
    options: &SummaryOptions,
    config: &MedLensConfig,
) -> Result<AnalysisStream, MedLensError> {
    info!("Starting streaming analysis: {}", document.filename());

    let backend = resolve_backend(config)?;
    let prepared = prepare(document, options, config, Some(&backend)).await?;

    let client = SummaryClient::new(backend, config.model.as_str())
        .with_temperature(config.temperature);
    let prompt = prepared.prompt.clone();
    let options = options.clone();
    let callback = config.progress_callback.clone();

    let s = stream::iter(config.variants.clone()).then(move |variant| {
        let client = client.clone();
        let prompt = prompt.clone();
        let options = options.clone();
        let callback = callback.clone();
        async move {
            if let Some(ref cb) = callback {
                cb.on_variant_start(variant);
            }
            let result = client.summarize_variant(&prompt, variant, &options).await;
            if let Some(ref cb) = callback {
                match &result.error {
                    None => cb.on_variant_complete(variant, result.text.len()),
                    Some(e) => cb.on_variant_error(variant, &e.to_string()),
                }
            }
            result
        }
    });

    Ok(AnalysisStream {
        extracted: prepared.extracted,
        flagged: prepared.flagged,
        matched_keywords: prepared.matched_keywords,
        prompt: prepared.prompt,
        variants: Box::pin(s),
    })
}

/// Read `path` and [`analyze_stream`] it.
///
/// # Example
/// ```rust,no_run
/// use medlens::{analyze_stream_file, MedLensConfig, SummaryOptions};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = MedLensConfig::from_env()?;
/// let mut analysis = analyze_stream_file("report.pdf", &SummaryOptions::default(), &config).await?;
/// while let Some(summary) = analysis.variants.next().await {
///     println!("## {}\n{}", summary.variant.title(), summary.text);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn analyze_stream_file(
    path: impl AsRef<Path>,
    options: &SummaryOptions,
    config: &MedLensConfig,
) -> Result<AnalysisStream, MedLensError> {
    let document = input::load_document(path).await?;
    analyze_stream(&document, options, config).await
}
