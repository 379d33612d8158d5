//! Retry guard for the engine's fault-retry loops

use tiersim_common::config::RetryConfig;
use tiersim_common::{Error, Result};

/// Counts failed attempts of one retry loop against the configured limit
#[derive(Clone, Debug)]
pub struct RetryBudget {
    operation: &'static str,
    limit: Option<u32>,
    failures: u32,
}

impl RetryBudget {
    #[must_use]
    pub const fn new(operation: &'static str, config: &RetryConfig) -> Self {
        Self {
            operation,
            limit: config.max_attempts,
            failures: 0,
        }
    }

    /// Record a failed attempt
    ///
    /// Fails with [`Error::RetryLimitExceeded`] once the limit is reached.
    pub fn record_failure(&mut self) -> Result<()> {
        self.failures = self.failures.saturating_add(1);
        if self.limit.is_some_and(|limit| self.failures >= limit) {
            return Err(Error::RetryLimitExceeded {
                operation: self.operation.to_string(),
                attempts: self.failures,
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_never_trips() {
        let mut budget = RetryBudget::new("read", &RetryConfig::default());
        for _ in 0..10_000 {
            budget.record_failure().unwrap();
        }
        assert_eq!(budget.failures(), 10_000);
    }

    #[test]
    fn test_limit_trips_on_last_attempt() {
        let mut budget = RetryBudget::new("overwrite", &RetryConfig { max_attempts: Some(3) });
        assert!(budget.record_failure().is_ok());
        assert!(budget.record_failure().is_ok());
        match budget.record_failure() {
            Err(Error::RetryLimitExceeded {
                operation,
                attempts,
            }) => {
                assert_eq!(operation, "overwrite");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected retry limit, got {other:?}"),
        }
    }
}
