//! Prompt text and in-band placeholders.
//!
//! Every instruction block sent to the model lives here so that prompt
//! wording can change in one place and unit tests can assert on it without
//! calling a model. Placeholder strings that stand in for missing content
//! are kept next to them because they end up inside prompts too.

/// Opening line of every summary prompt.
pub const INTRO: &str =
    "You are an assistant that converts medical reports into a short, patient-friendly summary.";

/// Tone block: [`crate::Tone::ConciseBullets`].
pub const CONCISE_BULLETS: &str =
    "Return a short title, 4-6 bullet points in simple language, and 1 'next steps' line.";

/// Tone block: [`crate::Tone::FriendlyExplanation`].
pub const FRIENDLY_EXPLANATION: &str =
    "Return a small paragraph in friendly, reassuring language and 3 practical next steps.";

/// Tone block: [`crate::Tone::FormalDoctorNote`].
pub const FORMAL_DOCTOR_NOTE: &str =
    "Return a short clinical summary suitable for doctor's review.";

/// Always present after the tone block.
pub const PLAIN_LANGUAGE: &str =
    "Patient-friendly, avoid medical jargon; when jargon is necessary, explain in parentheses.";

/// Appended when the output language is Hindi.
pub const HINDI_INSTRUCTION: &str = "Translate the output to Hindi. Adapt it culturally rather \
than word-for-word, and keep the original English clinical terms in parentheses.";

/// Marker line preceding the embedded report text.
pub const REPORT_HEADER: &str = "Report text:\n";

/// Appended to the primary prompt for the clinician variant.
pub const CLINICIAN_SUFFIX: &str =
    "\n\nNow produce a short clinical summary of 3-4 lines suitable for a physician.";

/// Appended to the primary prompt for the next-steps variant.
pub const NEXT_STEPS_SUFFIX: &str =
    "\n\nList 3 next steps the patient should take (tests, when to see doctor).";

/// Instruction sent with each page image when a vision model is used as OCR.
pub const OCR_PROMPT: &str = "Transcribe all text visible in this scanned medical document \
image exactly as written, in reading order. Output plain text only, with no commentary, \
no Markdown and no translation. If no text is visible, output nothing.";

/// Placeholder for an upload that yielded only whitespace.
pub const NO_READABLE_TEXT: &str = "[No readable text extracted from document]";

/// Placeholder for a model response that carried no text.
pub const NO_MODEL_OUTPUT: &str = "[No output from model]";

/// Persona tone block.
pub fn persona_instruction(persona: &str) -> String {
    format!(
        "Write the summary in the voice of {persona}, keeping every medical fact accurate. \
Return a short title and 4-6 plain-language bullet points in that voice."
    )
}

/// Placeholder for a failed model call.
pub fn model_error(backend: &str, reason: &str) -> String {
    format!("[Error from {backend} API: {reason}]")
}
