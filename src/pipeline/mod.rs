//! Pipeline stages for report summarisation.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and an engine can be swapped without touching its neighbours.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ safety ──▶ prompt ──▶ summarize ──▶ postprocess
//! (file)    (pdf/ocr)   (flag)    (template)  (llm)        (cleanup)
//! ```
//!
//! 1. [`input`]: read the upload and classify it by extension
//! 2. [`extract`]: ordered strategy chain per kind; uses [`pdf`] (pdfium,
//!    in `spawn_blocking`), [`encode`] (grayscale, PNG/base64) and [`ocr`]
//! 3. [`safety`]: critical-keyword flag, informational only
//! 4. [`prompt`]: tone/persona/language template plus truncated report
//! 5. [`summarize`]: one model call per variant via [`llm`]; the only
//!    stage with network I/O besides vision OCR
//! 6. [`postprocess`]: deterministic cleanup of model output

pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod pdf;
pub mod postprocess;
pub mod prompt;
pub mod safety;
pub mod summarize;
