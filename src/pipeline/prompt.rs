//! Prompt construction.
//!
//! The primary prompt is a pure function of the extracted text, the
//! filename and [`SummaryOptions`]:
//!
//! ```text
//! <intro>
//!
//! Filename: <name>
//!
//! <tone or persona block>
//!
//! <plain-language line>
//! [<Hindi translation clause>]
//!
//! Report text:
//! <report, hard-cut at MAX_REPORT_CHARS characters>
//! ```
//!
//! Variant prompts are the primary prompt with the variant's instruction
//! appended, so every variant carries the primary instructions verbatim.

use crate::options::{Language, SummaryOptions, SummaryVariant, Tone};
use crate::output::ExtractedText;
use crate::prompts::{
    persona_instruction, CONCISE_BULLETS, FORMAL_DOCTOR_NOTE, FRIENDLY_EXPLANATION,
    HINDI_INSTRUCTION, INTRO, PLAIN_LANGUAGE, REPORT_HEADER,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum number of report characters embedded in a prompt.
pub const MAX_REPORT_CHARS: usize = 30_000;

/// A rendered prompt with the position of the embedded report text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptText {
    text: String,
    /// Byte range of the report segment within `text`.
    report_start: usize,
    report_end: usize,
    truncated: bool,
}

impl PromptText {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// The (possibly truncated) report text as embedded.
    pub fn report_segment(&self) -> &str {
        &self.text[self.report_start..self.report_end]
    }

    pub fn was_truncated(&self) -> bool {
        self.truncated
    }

    /// This prompt extended with `variant`'s instruction.
    pub fn for_variant(&self, variant: SummaryVariant) -> PromptText {
        let mut next = self.clone();
        next.text.push_str(variant.instruction_suffix());
        next
    }
}

/// Cut `text` to at most `max_chars` characters, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

/// The instruction block for the chosen tone or persona.
pub fn tone_instruction(options: &SummaryOptions) -> String {
    if let Some(persona) = options.active_persona() {
        return persona_instruction(persona);
    }
    match options.tone {
        Tone::ConciseBullets => CONCISE_BULLETS,
        Tone::FriendlyExplanation => FRIENDLY_EXPLANATION,
        Tone::FormalDoctorNote => FORMAL_DOCTOR_NOTE,
    }
    .to_string()
}

/// Build the primary (patient) prompt. `extracted.content` is embedded as
/// is, so a placeholder is summarised like any other text.
pub fn build_primary_prompt(
    extracted: &ExtractedText,
    filename: &str,
    options: &SummaryOptions,
) -> PromptText {
    let (report, truncated) = truncate_chars(&extracted.content, MAX_REPORT_CHARS);
    if truncated {
        debug!(
            "Report text for '{}' cut to {} chars",
            filename, MAX_REPORT_CHARS
        );
    }

    let mut text = String::with_capacity(report.len() + 1024);
    text.push_str(INTRO);
    text.push_str("\n\nFilename: ");
    text.push_str(filename);
    text.push_str("\n\n");
    text.push_str(&tone_instruction(options));
    text.push_str("\n\n");
    text.push_str(PLAIN_LANGUAGE);
    if options.language == Language::Hindi {
        text.push('\n');
        text.push_str(HINDI_INSTRUCTION);
    }
    text.push_str("\n\n");
    text.push_str(REPORT_HEADER);

    let report_start = text.len();
    text.push_str(report);
    let report_end = text.len();

    PromptText {
        text,
        report_start,
        report_end,
        truncated,
    }
}

/// Build the prompt for `variant`: the primary prompt plus its suffix.
pub fn build_prompt(
    extracted: &ExtractedText,
    filename: &str,
    options: &SummaryOptions,
    variant: SummaryVariant,
) -> PromptText {
    build_primary_prompt(extracted, filename, options).for_variant(variant)
}
