//! Per-request summary options.
//!
//! [`SummaryOptions`] is an immutable value chosen by the caller for one
//! upload (language, tone, persona, length hint). It is passed into the
//! prompt builder explicitly; nothing in the pipeline reads UI or session
//! state, and nothing mutates the options.

use crate::prompts::{CLINICIAN_SUFFIX, NEXT_STEPS_SUFFIX};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest accepted generation length hint.
pub const MIN_LENGTH_HINT: usize = 64;
/// Largest accepted generation length hint.
pub const MAX_LENGTH_HINT: usize = 1024;

/// Output language of the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    Hindi,
}

/// Summary style. A non-blank [`SummaryOptions::persona`] overrides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tone {
    /// Short title, 4–6 bullets, one next-steps line. (default)
    #[default]
    ConciseBullets,
    /// A reassuring paragraph plus three practical next steps.
    FriendlyExplanation,
    /// A short clinical note for a doctor's review.
    FormalDoctorNote,
}

/// Options for one summarisation request.
///
/// # Example
/// ```rust
/// use medlens::{Language, SummaryOptions, Tone};
///
/// let options = SummaryOptions::default()
///     .language(Language::Hindi)
///     .tone(Tone::FriendlyExplanation)
///     .max_length(500);
/// assert_eq!(options.max_length, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOptions {
    pub language: Language,
    pub tone: Tone,
    /// Named stylistic voice; selects the persona instruction block.
    pub persona: Option<String>,
    /// Approximate output length for the primary summary, in tokens.
    /// Forwarded to the model as a hint; not enforced on the returned text.
    pub max_length: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            language: Language::default(),
            tone: Tone::default(),
            persona: None,
            max_length: 300,
        }
    }
}

impl SummaryOptions {
    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = n.clamp(MIN_LENGTH_HINT, MAX_LENGTH_HINT);
        self
    }

    /// The persona, if one is set and not blank.
    pub fn active_persona(&self) -> Option<&str> {
        self.persona
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// One framing of the summary produced from the same extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummaryVariant {
    /// Patient-friendly summary; the primary prompt as built.
    Patient,
    /// Short clinician-style note.
    Clinician,
    /// Three concrete next steps for the patient.
    NextSteps,
}

impl SummaryVariant {
    /// Every variant, in display order.
    pub const ALL: [SummaryVariant; 3] = [
        SummaryVariant::Patient,
        SummaryVariant::Clinician,
        SummaryVariant::NextSteps,
    ];

    /// Instruction appended to the primary prompt. Empty for [`Self::Patient`].
    pub fn instruction_suffix(self) -> &'static str {
        match self {
            SummaryVariant::Patient => "",
            SummaryVariant::Clinician => CLINICIAN_SUFFIX,
            SummaryVariant::NextSteps => NEXT_STEPS_SUFFIX,
        }
    }

    /// Generation length hint for this variant.
    pub fn length_hint(self, primary_max_length: usize) -> usize {
        match self {
            SummaryVariant::Patient => primary_max_length,
            SummaryVariant::Clinician => 220,
            SummaryVariant::NextSteps => 120,
        }
    }

    /// Heading used when displaying this variant.
    pub fn title(self) -> &'static str {
        match self {
            SummaryVariant::Patient => "Patient-friendly summary",
            SummaryVariant::Clinician => "Clinician-style summary (brief)",
            SummaryVariant::NextSteps => "Next steps / Recommendations",
        }
    }
}

impl fmt::Display for SummaryVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SummaryVariant::Patient => "patient",
            SummaryVariant::Clinician => "clinician",
            SummaryVariant::NextSteps => "next-steps",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_length_is_clamped() {
        assert_eq!(SummaryOptions::default().max_length(10).max_length, 64);
        assert_eq!(SummaryOptions::default().max_length(5000).max_length, 1024);
        assert_eq!(SummaryOptions::default().max_length(300).max_length, 300);
    }

    #[test]
    fn blank_persona_is_ignored() {
        let options = SummaryOptions::default().persona("   ");
        assert_eq!(options.active_persona(), None);
        let options = SummaryOptions::default().persona(" Captain Calm ");
        assert_eq!(options.active_persona(), Some("Captain Calm"));
    }

    #[test]
    fn variant_hints() {
        assert_eq!(SummaryVariant::Patient.length_hint(300), 300);
        assert_eq!(SummaryVariant::Clinician.length_hint(300), 220);
        assert_eq!(SummaryVariant::NextSteps.length_hint(300), 120);
        assert!(SummaryVariant::Patient.instruction_suffix().is_empty());
        assert!(!SummaryVariant::NextSteps.instruction_suffix().is_empty());
    }
}
