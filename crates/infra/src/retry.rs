use tracing::warn;

use crate::error::ServiceError;

/// Run `attempt` until it succeeds, fails with a non-retryable error, or
/// `max_retries` re-runs have been spent on conflicts.
pub(crate) fn retry_on_conflict<T>(
    operation: &'static str,
    max_retries: u32,
    mut attempt: impl FnMut() -> Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    let mut retries = 0;
    loop {
        match attempt() {
            Err(err) if err.is_retryable() && retries < max_retries => {
                retries += 1;
                warn!(operation, retries, max_retries, error = %err, "conflicting write; re-planning");
            }
            Err(err) if err.is_retryable() => {
                warn!(operation, retries, error = %err, "giving up after repeated conflicts");
                return Err(err);
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn retries_conflicts_then_succeeds() {
        let calls = Cell::new(0);
        let result = retry_on_conflict("test", 3, || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(ServiceError::Conflict("stale".into()))
            } else {
                Ok(calls.get())
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn stops_after_budget() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_on_conflict("test", 2, || {
            calls.set(calls.get() + 1);
            Err(ServiceError::Conflict("stale".into()))
        });
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_on_conflict("test", 5, || {
            calls.set(calls.get() + 1);
            Err(ServiceError::Validation("bad".into()))
        });
        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(calls.get(), 1);
    }
}
