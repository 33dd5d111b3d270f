//! Content-safety policy.
//!
//! The policy is an explicit value passed into the validator at
//! construction, so tests substitute alternate policies without touching
//! process-wide state. The default policy forbids certainty/prediction
//! language in both Korean and English and maps each forbidden term to an
//! approved softer synonym.

use serde::{Deserialize, Serialize};

/// Lexical and structural rules for generated articles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPolicy {
    /// Terms that must not appear anywhere in title or body.
    /// Matching is case-insensitive substring matching.
    pub forbidden_terms: Vec<String>,
    /// Forbidden term → softer replacement used by sanitization.
    /// Replacements must never themselves contain a forbidden term,
    /// which is what makes sanitization idempotent.
    pub replacements: Vec<(String, String)>,
    /// Disclaimer string that must appear verbatim in the body.
    pub disclaimer: String,
    /// Minimum number of second-level section headers.
    pub min_sections: usize,
    /// Minimum body length in characters.
    pub min_chars: usize,
}

const FORBIDDEN_TERMS: [&str; 11] = [
    "definitely",
    "guaranteed",
    "100%",
    "must happen",
    "will happen",
    "certain",
    "확실히",
    "반드시",
    "틀림없이",
    "보장",
    "무조건",
];

const REPLACEMENTS: [(&str, &str); 11] = [
    ("definitely", "likely"),
    ("guaranteed", "possible"),
    ("100%", "highly"),
    ("must happen", "may happen"),
    ("will happen", "might happen"),
    ("certain", "probable"),
    ("확실히", "아마도"),
    ("반드시", "가능하면"),
    ("틀림없이", "그럴 수 있습니다"),
    ("보장", "가능성"),
    ("무조건", "경우에 따라"),
];

const DISCLAIMER: &str = "참고 자료일 뿐";

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            forbidden_terms: FORBIDDEN_TERMS.iter().map(|s| s.to_string()).collect(),
            replacements: REPLACEMENTS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            disclaimer: DISCLAIMER.to_string(),
            min_sections: 3,
            min_chars: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Sanitization idempotence depends on this: a replacement containing a
    // forbidden term would reintroduce violations on every pass.
    #[test]
    fn replacements_never_contain_forbidden_terms() {
        let policy = ContentPolicy::default();
        for (_, replacement) in &policy.replacements {
            let lowered = replacement.to_lowercase();
            for term in &policy.forbidden_terms {
                assert!(
                    !lowered.contains(&term.to_lowercase()),
                    "replacement \"{replacement}\" contains forbidden term \"{term}\""
                );
            }
        }
    }

    #[test]
    fn every_forbidden_term_has_a_replacement() {
        let policy = ContentPolicy::default();
        for term in &policy.forbidden_terms {
            assert!(
                policy.replacements.iter().any(|(from, _)| from == term),
                "no replacement mapped for \"{term}\""
            );
        }
    }
}
