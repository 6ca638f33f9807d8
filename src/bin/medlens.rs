//! CLI binary for medlens.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `MedLensConfig` / `SummaryOptions` and prints the summaries.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use medlens::config::DEFAULT_MODEL;
use medlens::{
    analyze, inspect, list_models, load_document, write_summary, AnalysisProgressCallback,
    ExtractedText, ExtractionFailurePolicy, ExtractionStatus, Language, MedLensConfig, OcrMode,
    PdfOcrFallback, ProgressCallback, SummaryOptions, SummaryVariant, Tone,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Characters of extracted text shown by `--show-raw`.
const RAW_PREVIEW_CHARS: usize = 10_000;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner for the stage in flight and one
/// log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    stage_start: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_start: Mutex::new(None),
        })
    }

    fn start_stage(&self, prefix: &'static str, msg: String) {
        if let Ok(mut start) = self.stage_start.lock() {
            *start = Some(Instant::now());
        }
        self.bar.set_prefix(prefix);
        self.bar.set_message(msg);
    }

    fn elapsed(&self) -> String {
        let secs = self
            .stage_start
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, filename: &str) {
        self.start_stage("Reading", filename.to_string());
    }

    fn on_extraction_complete(&self, status: ExtractionStatus, char_count: usize) {
        let mark = match status {
            ExtractionStatus::Ok => green("✓"),
            ExtractionStatus::Empty => yellow("∅"),
            ExtractionStatus::ExtractionError => red("✗"),
        };
        self.bar.println(format!(
            "  {mark} Extracted  {:<12}  {}",
            dim(&format!("{char_count:>6} chars")),
            self.elapsed()
        ));
    }

    fn on_variant_start(&self, variant: SummaryVariant) {
        self.start_stage("Summarising", variant.title().to_string());
    }

    fn on_variant_complete(&self, variant: SummaryVariant, text_len: usize) {
        self.bar.println(format!(
            "  {} {:<12}  {:<12}  {}",
            green("✓"),
            variant.to_string(),
            dim(&format!("{text_len:>6} chars")),
            self.elapsed()
        ));
    }

    fn on_variant_error(&self, variant: SummaryVariant, error: &str) {
        // Keep long provider errors to one line.
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<12}  {}  {}",
            red("✗"),
            variant.to_string(),
            red(&msg),
            self.elapsed()
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise a lab report (stdout)
  medlens blood_test.pdf

  # Hindi, friendly tone, save medlens output next to the report
  medlens --language hi --tone friendly scan.jpg -o summaries/

  # Only the patient and next-steps variants
  medlens --variants patient,next-steps report.txt

  # See what text was read, without calling a model (no API key needed)
  medlens --extract-only --show-raw report.pdf

  # Route through another provider via edgequake-llm
  medlens --provider openai --model gpt-4.1-mini report.pdf

  # Structured output
  medlens --json report.pdf > report.json

  # Which models does the configured key reach?
  medlens --list-models

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY      Gemini API key (required unless --provider is set)
  MODEL_NAME          Model ID (default: models/gemini-2.0-flash)
  MEDLENS_PROVIDER    edgequake-llm provider name (openai, anthropic, ollama, …)
  PDFIUM_LIB_PATH     pdfium shared library, or the directory holding it
  RUST_LOG            Log filter, overrides -v / -q

NOTE:
  medlens is an informational aid, not a diagnosis. When urgent-sounding
  terms are found a warning is printed; always confirm with a clinician.
"#;

/// Summarise medical reports (PDF, scanned image, text) in plain language.
#[derive(Parser, Debug)]
#[command(
    name = "medlens",
    version,
    about = "Summarise medical reports in plain language using a generative model",
    long_about = "Extract text from a medical report (PDF text layer, OCR of scans and photos, or \
plain text), then ask a generative model for a patient-friendly summary, a clinician-style note \
and concrete next steps. Works with Google Gemini directly, or any provider supported by \
edgequake-llm.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Report file: .pdf, .png, .jpg, .jpeg or .txt.
    #[arg(required_unless_present = "list_models")]
    file: Option<PathBuf>,

    /// Output language.
    #[arg(short, long, env = "MEDLENS_LANGUAGE", value_enum, default_value = "en")]
    language: LanguageArg,

    /// Summary tone.
    #[arg(short, long, env = "MEDLENS_TONE", value_enum, default_value = "concise")]
    tone: ToneArg,

    /// Write the summary in this voice instead of a tone (e.g. "a kindly grandmother").
    #[arg(long, env = "MEDLENS_PERSONA")]
    persona: Option<String>,

    /// Approximate length of the patient summary, in tokens (64–1024).
    #[arg(long, env = "MEDLENS_MAX_LENGTH", default_value_t = 300,
          value_parser = clap::value_parser!(u16).range(64..=1024))]
    max_length: u16,

    /// Comma-separated variants to produce, in order.
    #[arg(long, env = "MEDLENS_VARIANTS", value_enum, value_delimiter = ',',
          default_values_t = [VariantArg::Patient, VariantArg::Clinician, VariantArg::NextSteps])]
    variants: Vec<VariantArg>,

    /// Model ID, with or without the `models/` prefix.
    #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL)]
    model: String,

    /// Gemini API key.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Use this edgequake-llm provider instead of the Gemini REST API.
    #[arg(long, env = "MEDLENS_PROVIDER")]
    provider: Option<String>,

    /// Separate model for OCR of scans and images (defaults to --model).
    #[arg(long, env = "MEDLENS_OCR_MODEL")]
    ocr_model: Option<String>,

    /// OCR scanned PDFs automatically when they have no text layer.
    #[arg(long, env = "MEDLENS_PDF_OCR", value_enum, default_value = "auto")]
    pdf_ocr: PdfOcrArg,

    /// Disable OCR entirely (images and scans yield a placeholder).
    #[arg(long, env = "MEDLENS_NO_OCR")]
    no_ocr: bool,

    /// What to do when no text could be extracted.
    #[arg(long, env = "MEDLENS_ON_EXTRACTION_FAILURE", value_enum, default_value = "summarize")]
    on_extraction_failure: FailurePolicyArg,

    /// Print the extracted text (first 10 000 chars) before the summaries.
    #[arg(long)]
    show_raw: bool,

    /// Write `<file>.summary.txt` into this directory.
    #[arg(short, long, env = "MEDLENS_OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Output the full analysis as JSON.
    #[arg(long, env = "MEDLENS_JSON")]
    json: bool,

    /// Extract and flag only; no model call, no API key needed.
    #[arg(long)]
    extract_only: bool,

    /// List the models the configured backend offers, then exit.
    #[arg(long)]
    list_models: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MEDLENS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, env = "MEDLENS_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "MEDLENS_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LanguageArg {
    En,
    Hi,
}

impl From<LanguageArg> for Language {
    fn from(v: LanguageArg) -> Self {
        match v {
            LanguageArg::En => Language::English,
            LanguageArg::Hi => Language::Hindi,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ToneArg {
    Concise,
    Friendly,
    Formal,
}

impl From<ToneArg> for Tone {
    fn from(v: ToneArg) -> Self {
        match v {
            ToneArg::Concise => Tone::ConciseBullets,
            ToneArg::Friendly => Tone::FriendlyExplanation,
            ToneArg::Formal => Tone::FormalDoctorNote,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum VariantArg {
    Patient,
    Clinician,
    NextSteps,
}

impl From<VariantArg> for SummaryVariant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Patient => SummaryVariant::Patient,
            VariantArg::Clinician => SummaryVariant::Clinician,
            VariantArg::NextSteps => SummaryVariant::NextSteps,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PdfOcrArg {
    Auto,
    Off,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FailurePolicyArg {
    Summarize,
    Abort,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters; keep library INFO
    // logs out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress = (show_progress && !cli.list_models).then(CliProgressCallback::new);
    let outcome = run(&cli, progress.clone()).await;
    // Early returns skip the in-line finish; never leave the spinner behind.
    if let Some(ref cb) = progress {
        cb.finish();
    }
    outcome
}

async fn run(cli: &Cli, progress: Option<Arc<CliProgressCallback>>) -> Result<()> {
    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(cli, progress.clone().map(|cb| cb as ProgressCallback))?;

    // No credential is fatal before any input is touched.
    if !cli.extract_only {
        config.require_credential()?;
    }

    if cli.list_models {
        return print_models(&config).await;
    }

    let file = cli.file.as_ref().context("A report file is required")?;
    let document = load_document(file).await?;

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let report = inspect(&document, &config)
            .await
            .context("Failed to read report")?;
        if let Some(ref cb) = progress {
            cb.finish();
        }

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        } else {
            if report.flagged {
                print_warning_banner(&report.matched_keywords);
            }
            println!("File:       {}", report.filename);
            println!("Kind:       {}", report.kind);
            println!("Status:     {:?}", report.extracted.status);
            println!("Characters: {}", report.extracted.char_count());
            if let Some(problem) = report.extracted.problem() {
                println!("Problem:    {problem}");
            }
            if cli.show_raw {
                print_raw(&report.extracted);
            }
        }
        return Ok(());
    }

    // ── Run analysis ─────────────────────────────────────────────────────
    let options = build_options(cli);
    let report = analyze(&document, &options, &config)
        .await
        .context("Analysis failed")?;
    if let Some(ref cb) = progress {
        cb.finish();
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else {
        if report.flagged {
            print_warning_banner(&report.matched_keywords);
        }
        if let Some(problem) = report.extracted.problem() {
            eprintln!(
                "{} No usable text was extracted ({problem}); the summaries below describe the placeholder.",
                yellow("⚠")
            );
        }
        if cli.show_raw {
            print_raw(&report.extracted);
        }
        for summary in &report.summaries {
            println!("{}\n", bold(&format!("## {}", summary.variant.title())));
            println!("{}\n", summary.text);
        }
        if report.flagged {
            println!(
                "{}",
                red("Urgent-sounding language detected; advise immediate clinical follow-up.")
            );
        }
    }

    // ── Write artifact ───────────────────────────────────────────────────
    if let Some(ref dir) = cli.output {
        let path = write_summary(&report, dir)
            .await
            .context("Failed to save summary")?;
        if !cli.quiet {
            eprintln!("{}  saved  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    if !cli.quiet && !cli.json {
        let s = &report.stats;
        let mark = if s.failed_variants == 0 {
            green("✔")
        } else {
            cyan("⚠")
        };
        eprintln!(
            "{mark}  {}/{} summaries  {}  extraction {}ms  ·  model {}ms",
            report.summaries.len() - s.failed_variants,
            report.summaries.len(),
            dim(&format!("{}ms total", s.total_duration_ms)),
            s.extraction_duration_ms,
            s.summarization_duration_ms,
        );
    }

    Ok(())
}

async fn print_models(config: &MedLensConfig) -> Result<()> {
    let (backend, models) = list_models(config).await.context("Failed to list models")?;
    if models.is_empty() {
        println!("{backend} does not list models; configured model: {}", config.model);
        return Ok(());
    }
    let configured = config.model.trim_start_matches("models/");
    for model in &models {
        let mark = if model.trim_start_matches("models/") == configured {
            green("*")
        } else {
            " ".to_string()
        };
        println!("{mark} {model}");
    }
    Ok(())
}

fn print_warning_banner(matched: &[String]) {
    println!(
        "{} {}",
        red("⚠"),
        bold(&red(&format!(
            "Possible urgent findings ({}). This summary is not medical advice; contact a clinician promptly.",
            matched.join(", ")
        )))
    );
    println!();
}

fn print_raw(extracted: &ExtractedText) {
    println!("{}", bold("## Extracted text"));
    println!("{}\n", extracted.preview(RAW_PREVIEW_CHARS));
}

/// Map CLI args to `SummaryOptions`.
fn build_options(cli: &Cli) -> SummaryOptions {
    let mut options = SummaryOptions::default()
        .language(cli.language.into())
        .tone(cli.tone.into())
        .max_length(usize::from(cli.max_length));
    if let Some(ref persona) = cli.persona {
        options = options.persona(persona.as_str());
    }
    options
}

/// Map CLI args to `MedLensConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<MedLensConfig> {
    let variants: Vec<SummaryVariant> = cli.variants.iter().map(|&v| v.into()).collect();

    let mut builder = MedLensConfig::builder()
        .model(cli.model.as_str())
        .variants(variants)
        .ocr(if cli.no_ocr {
            OcrMode::Disabled
        } else {
            OcrMode::Vision
        })
        .pdf_ocr_fallback(match cli.pdf_ocr {
            PdfOcrArg::Auto => PdfOcrFallback::Automatic,
            PdfOcrArg::Off => PdfOcrFallback::Disabled,
        })
        .on_extraction_failure(match cli.on_extraction_failure {
            FailurePolicyArg::Summarize => ExtractionFailurePolicy::Summarize,
            FailurePolicyArg::Abort => ExtractionFailurePolicy::Abort,
        });

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.as_str());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.as_str());
    }
    if let Some(ref model) = cli.ocr_model {
        builder = builder.ocr_model(model.as_str());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_models_needs_no_report_file() {
        let cli = Cli::try_parse_from(["medlens", "--list-models"]).unwrap();
        assert!(cli.list_models);
        assert!(cli.file.is_none());

        let cli = Cli::try_parse_from(["medlens", "report.txt"]).unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("report.txt")));
        assert!(!cli.list_models);
    }

    #[test]
    fn spinner_clears_on_repeated_finish() {
        let cb = CliProgressCallback::new();
        cb.on_extraction_start("r.pdf");
        cb.finish();
        cb.finish();
        assert!(cb.bar.is_finished());
    }
}
