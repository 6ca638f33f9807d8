//! Post-processing: deterministic cleanup of model-written summaries.
//!
//! Even with a plain-text prompt, models sometimes wrap their answer in a
//! ```` ```markdown ```` fence, emit `\r\n` line endings or pad the text
//! with runs of blank lines and zero-width characters. These rules fix
//! presentation only; wording is never touched.
//!
//! ## Rule Order
//!
//! Fences are stripped first so the line rules see the real content, and
//! line endings are normalised before any per-line trimming.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw model summary.
///
/// 1. Strip an outer code fence (```` ``` ```` or ```` ```markdown ````)
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 1
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 6. Trim trailing whitespace at the end
pub fn clean_summary(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim_end().to_string()
}

// ── Rule 1: Strip outer fence ────────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:markdown|md|text)?[ \t]*\r?\n(.*?)\r?\n```\s*$").unwrap()
});

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse blank-line runs ─────────────────────────────────────────

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").into_owned()
}

// ── Rule 5: Remove invisible characters ──────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fence() {
        let input = "```markdown\n**Blood count**\n- Normal\n```";
        assert_eq!(clean_summary(input), "**Blood count**\n- Normal");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(clean_summary("```\nAll normal.\n```\n"), "All normal.");
    }

    #[test]
    fn inner_fences_are_kept() {
        let input = "Intro\n```\ncode\n```\nOutro";
        assert_eq!(clean_summary(input), input);
    }

    #[test]
    fn normalises_crlf_and_trailing_spaces() {
        assert_eq!(clean_summary("a  \r\nb\t\r\n"), "a\nb");
    }

    #[test]
    fn collapses_blank_runs() {
        assert_eq!(clean_summary("Title\n\n\n\n\n- point"), "Title\n\n- point");
        assert_eq!(clean_summary("Title\n\n- point"), "Title\n\n- point");
    }

    #[test]
    fn removes_invisible_characters() {
        assert_eq!(
            clean_summary("\u{FEFF}Hb\u{200B} normal\u{00AD}"),
            "Hb normal"
        );
    }

    #[test]
    fn plain_text_is_untouched() {
        let s = "Your blood test looks normal.\n\n- Hb: fine\n- Next: routine check";
        assert_eq!(clean_summary(s), s);
    }

    #[test]
    fn devanagari_survives() {
        let s = "आपकी रिपोर्ट सामान्य है।";
        assert_eq!(clean_summary(s), s);
    }
}
