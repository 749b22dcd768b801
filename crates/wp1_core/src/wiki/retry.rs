//! Bounded retry for live API calls.

use crate::wiki::ApiResult;
use log::warn;

/// Fixed attempt budget, no backoff; project-level retries happen upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is treated as 1.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `call` until it succeeds, fails permanently, or the budget is
    /// spent. Failures collapse to `None` ("no data").
    pub fn run<T>(&self, operation: &str, mut call: impl FnMut() -> ApiResult<T>) -> Option<T> {
        for attempt in 1..=self.max_attempts {
            match call() {
                Ok(value) => return Some(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        "event=api_retry module=wiki status=retry operation={operation} attempt={attempt} max_attempts={} error={err}",
                        self.max_attempts
                    );
                }
                Err(err) => {
                    warn!(
                        "event=api_call module=wiki status=error operation={operation} attempt={attempt} error={err}"
                    );
                    return None;
                }
            }
        }
        None
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::RetryPolicy;
    use crate::wiki::ApiError;
    use std::cell::Cell;

    #[test]
    fn transient_failures_are_retried_until_success() {
        let calls = Cell::new(0);
        let value = RetryPolicy::new(3).run("moves", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(ApiError::Transient("timeout".to_string()))
            } else {
                Ok(7)
            }
        });
        assert_eq!(value, Some(7));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn exhausted_budget_yields_none() {
        let calls = Cell::new(0);
        let value: Option<()> = RetryPolicy::new(3).run("moves", || {
            calls.set(calls.get() + 1);
            Err(ApiError::Transient("timeout".to_string()))
        });
        assert_eq!(value, None);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn permanent_failure_stops_immediately() {
        let calls = Cell::new(0);
        let value: Option<()> = RetryPolicy::new(5).run("redirect", || {
            calls.set(calls.get() + 1);
            Err(ApiError::Permanent("bad title".to_string()))
        });
        assert_eq!(value, None);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn zero_attempts_still_calls_once() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
    }
}
