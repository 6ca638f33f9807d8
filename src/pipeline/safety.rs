//! Critical-keyword flagging.
//!
//! A plain case-insensitive substring test against a fixed list. It is a
//! prompt to seek care, not a diagnosis: "non-urgent" still matches
//! "urgent", and that is accepted.

use crate::config::DEFAULT_CRITICAL_KEYWORDS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyFlagger {
    keywords: Vec<String>,
}

impl SafetyFlagger {
    /// Keywords are lowercased; blank ones are dropped.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// True iff any keyword occurs in `text`, ignoring case.
    pub fn flag(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }

    /// The keywords found in `text`, in list order.
    pub fn matches(&self, text: &str) -> Vec<&str> {
        let haystack = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| haystack.contains(k.as_str()))
            .map(String::as_str)
            .collect()
    }
}

impl Default for SafetyFlagger {
    fn default() -> Self {
        Self::new(DEFAULT_CRITICAL_KEYWORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_case_insensitively() {
        let f = SafetyFlagger::default();
        assert!(f.flag("URGENT review advised"));
        assert!(f.flag("Findings consistent with acute infarct."));
        assert!(f.flag("Patient has acute bleeding, needs urgent care."));
    }

    #[test]
    fn substring_matches_inside_words() {
        let f = SafetyFlagger::default();
        assert!(f.flag("non-urgent follow-up"));
        assert!(f.flag("no fractures seen"));
    }

    #[test]
    fn clean_report_is_not_flagged() {
        let f = SafetyFlagger::default();
        assert!(!f.flag("Haemoglobin 13.2 g/dL, within normal limits."));
        assert!(!f.flag(""));
    }

    #[test]
    fn every_default_keyword_flags_on_its_own() {
        let f = SafetyFlagger::default();
        for kw in DEFAULT_CRITICAL_KEYWORDS {
            assert!(f.flag(&format!("… {} …", kw.to_uppercase())), "{kw}");
        }
    }

    #[test]
    fn matches_lists_hits_in_order() {
        let f = SafetyFlagger::default();
        assert_eq!(
            f.matches("Stroke protocol; acute bleeding"),
            vec!["acute", "bleeding", "stroke"]
        );
    }

    #[test]
    fn custom_keywords_are_normalised() {
        let f = SafetyFlagger::new(["  Sepsis ", "", "   "]);
        assert_eq!(f.keywords(), ["sepsis".to_string()]);
        assert!(f.flag("suspected SEPSIS"));
        assert!(!SafetyFlagger::new(Vec::<String>::new()).flag("urgent"));
    }
}
