//! Result of a non-fatal stage

use crate::error::{Error, Stage};

/// What a non-fatal stage produced: its own value, or a fallback that was
/// substituted after it failed.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    /// The stage ran and its value is used as-is
    Completed(T),
    /// The stage failed or returned unusable data; `value` replaces it
    Fallback { value: T, reason: String },
}

impl<T> StageOutcome<T> {
    /// Keep `result`'s value, or log the failure and use `fallback()` instead
    pub fn recover<F>(stage: Stage, result: Result<T, Error>, fallback: F) -> Self
    where
        F: FnOnce() -> T,
    {
        match result {
            Ok(value) => StageOutcome::Completed(value),
            Err(e) => {
                tracing::warn!(%stage, error = %e, "stage failed, using fallback");
                StageOutcome::Fallback {
                    value: fallback(),
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn value(&self) -> &T {
        match self {
            StageOutcome::Completed(value) | StageOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StageOutcome::Fallback { .. })
    }

    /// Why the fallback was used
    pub fn reason(&self) -> Option<&str> {
        match self {
            StageOutcome::Completed(_) => None,
            StageOutcome::Fallback { reason, .. } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_completed() {
        let outcome = StageOutcome::recover(Stage::Rerank, Ok(vec![1.0]), Vec::new);
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.reason(), None);
        assert_eq!(outcome.value(), &vec![1.0]);
    }

    #[test]
    fn failure_uses_fallback_and_keeps_reason() {
        let outcome: StageOutcome<Option<String>> = StageOutcome::recover(
            Stage::Expansion,
            Err(Error::internal("model offline")),
            || None,
        );
        assert!(outcome.is_fallback());
        assert_eq!(outcome.value(), &None);
        assert!(outcome.reason().unwrap().contains("model offline"));
    }
}
