//! Error types for the medlens library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`MedLensError`]: **Fatal**: the request cannot proceed at all
//!   (file unreadable, no credential, extraction aborted by policy).
//!   Returned as `Err(MedLensError)` from the top-level `analyze*` functions.
//!
//! * [`ExtractionFailure`]: **Non-fatal**: text could not be pulled out of
//!   the upload (missing pdfium, no OCR engine, corrupt file). Stored inside
//!   [`crate::output::ExtractedText`] next to an in-band placeholder, so the
//!   pipeline keeps going and the caller can still see *why*.
//!
//! * [`GenerationError`]: **Non-fatal**: one call to the generative model
//!   failed. Stored inside [`crate::output::SummaryResult`]; the displayed
//!   text becomes a placeholder string instead.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the medlens library.
#[derive(Debug, Error)]
pub enum MedLensError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Report file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but reading it failed midway.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Credential / provider errors ──────────────────────────────────────
    /// No API key, provider or pre-built backend is configured.
    #[error("No model credential configured.\n{hint}")]
    MissingCredential { hint: String },

    /// A named edgequake-llm provider could not be created.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The backend could not list its models.
    #[error("Listing models from {backend} failed: {source}")]
    ModelListFailed {
        backend: String,
        #[source]
        source: GenerationError,
    },

    // ── Extraction ────────────────────────────────────────────────────────
    /// Extraction produced no usable text and the configured policy is
    /// [`crate::config::ExtractionFailurePolicy::Abort`].
    #[error("Text extraction failed for '{filename}': {reason}")]
    ExtractionAborted { filename: String, reason: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the summary artifact.
    #[error("Failed to write summary file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad category of an extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// An optional engine (pdfium, OCR) is not available on this machine.
    CapabilityUnavailable,
    /// The upload itself is unreadable: corrupt PDF, undecodable image, password.
    MalformedInput,
    /// The engine was present but failed while working.
    EngineError,
}

/// A non-fatal extraction failure: a kind plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ExtractionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ExtractionFailure {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::CapabilityUnavailable,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::MalformedInput,
            message: message.into(),
        }
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::EngineError,
            message: message.into(),
        }
    }

    /// The in-band placeholder shown (and, by default, summarised) in place
    /// of real report text.
    pub fn sentinel(&self) -> String {
        format!("[{}]", self.message)
    }
}

/// A failed call to a generative model.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GenerationError {
    /// Connection, DNS or TLS failure, or the provider client errored.
    #[error("request failed: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The body was not the JSON we expected.
    #[error("unreadable response: {0}")]
    InvalidResponse(String),

    /// The response held neither a text field nor any candidate text.
    #[error("model returned no output")]
    EmptyResponse,
}
