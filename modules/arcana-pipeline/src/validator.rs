//! Lexical and structural safety checks with in-place remediation.

use std::sync::LazyLock;

use regex::{NoExpand, Regex, RegexBuilder};
use tracing::{debug, warn};

use arcana_common::{ContentPolicy, Violation};

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^##\s+.+$").unwrap());

/// Result of validating one article.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

pub struct ContentValidator {
    policy: ContentPolicy,
    // Compiled once at construction; terms come from configuration, not
    // user input, so an invalid pattern is a startup bug.
    replacements: Vec<(Regex, String)>,
}

impl ContentValidator {
    pub fn new(policy: ContentPolicy) -> Self {
        let replacements = policy
            .replacements
            .iter()
            .map(|(term, replacement)| {
                let re = RegexBuilder::new(&regex::escape(term))
                    .case_insensitive(true)
                    .build()
                    .expect("escaped term is a valid pattern");
                (re, replacement.clone())
            })
            .collect();

        Self {
            policy,
            replacements,
        }
    }

    /// Check title and body against every rule. All violations are
    /// collected, not just the first, so one report names everything
    /// that needs fixing.
    pub fn validate(&self, title: &str, body: &str) -> ValidationReport {
        let mut violations = Vec::new();

        let haystack = format!("{title} {body}").to_lowercase();
        for term in &self.policy.forbidden_terms {
            if haystack.contains(&term.to_lowercase()) {
                violations.push(Violation::ForbiddenTerm { term: term.clone() });
            }
        }

        if !body.contains(&self.policy.disclaimer) {
            violations.push(Violation::MissingDisclaimer);
        }

        let found = SECTION_RE.find_iter(body).count();
        if found < self.policy.min_sections {
            violations.push(Violation::TooFewSections {
                found,
                required: self.policy.min_sections,
            });
        }

        let chars = body.chars().count();
        if chars < self.policy.min_chars {
            violations.push(Violation::TooShort {
                chars,
                minimum: self.policy.min_chars,
            });
        }

        if violations.is_empty() {
            debug!(title, "Content validation passed");
        } else {
            warn!(title, count = violations.len(), "Content validation failed");
        }

        ValidationReport { violations }
    }

    /// Replace every mapped forbidden term with its softer synonym,
    /// case-insensitively. Forbidden terms without a mapping are left in
    /// place for re-validation to report. Idempotent: the replacement
    /// vocabulary never intersects the forbidden set.
    pub fn sanitize(&self, body: &str) -> String {
        let mut sanitized = body.to_string();
        for (re, replacement) in &self.replacements {
            sanitized = re
                .replace_all(&sanitized, NoExpand(replacement.as_str()))
                .into_owned();
        }

        debug!(
            original_chars = body.chars().count(),
            sanitized_chars = sanitized.chars().count(),
            "Content sanitized"
        );
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ContentValidator {
        ContentValidator::new(ContentPolicy::default())
    }

    /// Body satisfying every default rule: disclaimer present, four `##`
    /// sections, well over 1000 characters, no forbidden terms.
    fn well_formed_body() -> String {
        let filler = "마음의 흐름을 천천히 들여다보면 지금의 감정이 어디에서 왔는지 조금씩 보이기 시작합니다. ";
        let mut body = String::new();
        for heading in ["들어가며", "카드가 비추는 마음", "관계를 바라보는 시선", "마무리"] {
            body.push_str(&format!("## {heading}\n\n"));
            body.push_str(&filler.repeat(8));
            body.push_str("\n\n");
        }
        body.push_str("이 글은 참고 자료일 뿐, 해석은 사람마다 다를 수 있습니다.\n");
        body
    }

    #[test]
    fn well_formed_body_passes() {
        let report = validator().validate("INFP와 달 카드 이야기", &well_formed_body());
        assert!(report.is_valid(), "violations: {:?}", report.violations);
    }

    #[test]
    fn forbidden_term_is_reported_by_name() {
        let body = format!("{} 이 관계는 definitely 잘 될 것입니다.", well_formed_body());
        let report = validator().validate("제목", &body);
        assert!(report.violations.contains(&Violation::ForbiddenTerm {
            term: "definitely".to_string()
        }));
    }

    #[test]
    fn forbidden_term_in_title_is_reported() {
        let report = validator().validate("반드시 읽어야 할 글", &well_formed_body());
        assert!(report.violations.contains(&Violation::ForbiddenTerm {
            term: "반드시".to_string()
        }));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let body = format!("{} 이것은 GUARANTEED 입니다.", well_formed_body());
        let report = validator().validate("제목", &body);
        assert!(report.violations.contains(&Violation::ForbiddenTerm {
            term: "guaranteed".to_string()
        }));
    }

    #[test]
    fn missing_disclaimer_is_reported() {
        let body = well_formed_body().replace("참고 자료일 뿐", "");
        let report = validator().validate("제목", &body);
        assert!(report.violations.contains(&Violation::MissingDisclaimer));
    }

    #[test]
    fn third_level_headers_do_not_count() {
        let body = well_formed_body().replace("## ", "### ");
        let report = validator().validate("제목", &body);
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::TooFewSections { found: 0, .. })));
    }

    #[test]
    fn short_body_is_reported_with_counts() {
        let report = validator().validate("제목", "짧은 글");
        assert!(report.violations.iter().any(
            |v| matches!(v, Violation::TooShort { chars, minimum: 1000 } if *chars < 1000)
        ));
    }

    #[test]
    fn sanitize_replaces_mapped_terms() {
        let sanitized = validator().sanitize("이 사랑은 definitely 이루어지고 반드시 행복해집니다.");
        assert!(!sanitized.contains("definitely"));
        assert!(sanitized.contains("likely"));
        assert!(!sanitized.contains("반드시"));
        assert!(sanitized.contains("가능하면"));
    }

    #[test]
    fn sanitize_is_case_insensitive() {
        let sanitized = validator().sanitize("Definitely DEFINITELY definitely");
        assert_eq!(sanitized, "likely likely likely");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let v = validator();
        let input = "이 관계는 확실히 좋아지고, guaranteed 100% 잘 됩니다. 무조건입니다.";
        let once = v.sanitize(input);
        let twice = v.sanitize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn unmapped_forbidden_term_survives_sanitization() {
        let policy = ContentPolicy {
            forbidden_terms: vec!["절대로".to_string()],
            replacements: Vec::new(),
            ..ContentPolicy::default()
        };
        let v = ContentValidator::new(policy);

        let body = "절대로 그렇게 됩니다.";
        let sanitized = v.sanitize(body);
        assert_eq!(sanitized, body);

        let report = v.validate("제목", &sanitized);
        assert!(report.violations.contains(&Violation::ForbiddenTerm {
            term: "절대로".to_string()
        }));
    }
}
