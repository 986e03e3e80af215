use crate::backend::Operation;
use crate::error::{IndexError, Result};
use std::future::Future;

/// Failures collected by a best-effort phase.
///
/// Each backend call that may fail without aborting its phase goes through
/// [`Outcome::attempt`]; the failure is logged and recorded as
/// [`IndexError::BackendCallFailed`] and the caller carries on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    failures: Vec<IndexError>,
}

impl Outcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn attempt<T, F>(&mut self, operation: Operation, store: &str, call: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        match call.await {
            Ok(value) => Some(value),
            Err(e) => {
                self.record(operation, store, &e);
                None
            }
        }
    }

    pub fn record(&mut self, operation: Operation, store: &str, error: &IndexError) {
        tracing::warn!(
            operation = %operation,
            store = %store,
            "Backend call failed: {}",
            error
        );
        self.failures.push(IndexError::BackendCallFailed {
            operation: operation.to_string(),
            store: store.to_string(),
            message: error.to_string(),
        });
    }

    /// Record a call that was not made because `reason` ruled it out.
    pub fn skip(&mut self, operation: Operation, store: &str, reason: &str) {
        tracing::warn!(operation = %operation, store = %store, "Skipped backend call: {}", reason);
        self.failures.push(IndexError::BackendCallFailed {
            operation: operation.to_string(),
            store: store.to_string(),
            message: reason.to_string(),
        });
    }

    pub fn merge(&mut self, other: Outcome) {
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[IndexError] {
        &self.failures
    }

    /// Stores named by the recorded failures, in order.
    pub fn failed_stores(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter_map(|f| match f {
                IndexError::BackendCallFailed { store, .. } => Some(store.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attempt_records_failures() {
        let mut outcome = Outcome::new();
        let ok = outcome
            .attempt(Operation::Index, "a", async { Ok::<_, IndexError>(7) })
            .await;
        let failed = outcome
            .attempt(Operation::DeleteStore, "b", async {
                Err::<(), _>(IndexError::Http("connection reset".into()))
            })
            .await;

        assert_eq!(ok, Some(7));
        assert!(failed.is_none());
        assert!(!outcome.is_clean());
        assert_eq!(outcome.failed_stores(), vec!["b"]);
        assert!(matches!(
            &outcome.failures()[0],
            IndexError::BackendCallFailed { operation, .. } if operation == "delete_store"
        ));
    }
}
