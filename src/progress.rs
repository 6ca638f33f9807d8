//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::MedLensConfigBuilder::progress_callback`] to be told
//! when extraction starts and finishes and when each summary variant is
//! requested and answered. The CLI uses it to drive a spinner; a web host
//! could forward the same events to a socket.
//!
//! # Example
//!
//! ```rust
//! use medlens::{AnalysisProgressCallback, MedLensConfig, SummaryVariant};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     answered: AtomicUsize,
//! }
//!
//! impl AnalysisProgressCallback for CountingCallback {
//!     fn on_variant_complete(&self, variant: SummaryVariant, text_len: usize) {
//!         self.answered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{variant}: {text_len} chars");
//!     }
//! }
//!
//! let config = MedLensConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { answered: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::options::SummaryVariant;
use crate::output::ExtractionStatus;
use std::sync::Arc;

/// Called by the pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Stages run one after another, but the trait is
/// `Send + Sync` so a callback can be shared with other tasks.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called before text extraction begins.
    fn on_extraction_start(&self, filename: &str) {
        let _ = filename;
    }

    /// Called after extraction with the final status and content length in chars.
    fn on_extraction_complete(&self, status: ExtractionStatus, char_count: usize) {
        let _ = (status, char_count);
    }

    /// Called just before the model is asked for `variant`.
    fn on_variant_start(&self, variant: SummaryVariant) {
        let _ = variant;
    }

    /// Called when the model answered `variant` with usable text.
    fn on_variant_complete(&self, variant: SummaryVariant, text_len: usize) {
        let _ = (variant, text_len);
    }

    /// Called when the call for `variant` failed; the summary holds a placeholder.
    fn on_variant_error(&self, variant: SummaryVariant, error: &str) {
        let _ = (variant, error);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::MedLensConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCallback {
        events: Mutex<Vec<String>>,
    }

    impl AnalysisProgressCallback for RecordingCallback {
        fn on_variant_start(&self, variant: SummaryVariant) {
            self.events.lock().unwrap().push(format!("start:{variant}"));
        }

        fn on_variant_error(&self, variant: SummaryVariant, error: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("error:{variant}:{error}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start("report.pdf");
        cb.on_extraction_complete(ExtractionStatus::Empty, 0);
        cb.on_variant_start(SummaryVariant::Patient);
        cb.on_variant_complete(SummaryVariant::Patient, 42);
        cb.on_variant_error(SummaryVariant::Clinician, "HTTP 500");
    }

    #[test]
    fn overridden_methods_receive_events() {
        let cb = RecordingCallback::default();
        cb.on_variant_start(SummaryVariant::NextSteps);
        cb.on_variant_complete(SummaryVariant::NextSteps, 10);
        cb.on_variant_error(SummaryVariant::NextSteps, "timeout");

        let events = cb.events.lock().unwrap();
        assert_eq!(
            *events,
            vec!["start:next-steps".to_string(), "error:next-steps:timeout".to_string()]
        );
    }
}
