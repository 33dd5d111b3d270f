use thiserror::Error;

use crate::types::Violation;

/// Errors surfaced by the pipeline. Every variant except `Exhausted` and
/// `Storage` is recorded as a failed ledger entry before the run aborts.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("combination space exhausted after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("content generation failed: {0}")]
    Generation(String),

    #[error("content failed validation: {}", fmt_violations(.0))]
    Validation(Vec<Violation>),

    #[error("publish failed after retries and fallback: {0}")]
    Publish(String),

    #[error("ledger storage error: {0}")]
    Storage(String),
}

fn fmt_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_violation() {
        let err = PipelineError::Validation(vec![
            Violation::ForbiddenTerm {
                term: "definitely".to_string(),
            },
            Violation::MissingDisclaimer,
        ]);
        let message = err.to_string();
        assert!(message.contains("definitely"));
        assert!(message.contains("disclaimer"));
    }
}
