use crate::providers::ProviderError;

/// What the engine should do after a failed enrichment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Call the provider again for the same record, immediately
    Retry,
    /// Stop trying and record explicit missing enrichment
    GiveUp,
}

/// Pure retry policy, kept free of I/O so it can be tested without a
/// provider. `attempt` counts attempts already made, starting at 1; a record
/// therefore sees at most `max_retries + 1` attempts in total. No-coverage
/// results are permanent and never retried.
pub fn decide(attempt: u32, max_retries: u32, error: &ProviderError) -> RetryDecision {
    match error {
        ProviderError::NoCoverage { .. } => RetryDecision::GiveUp,
        ProviderError::Transient(_) if attempt <= max_retries => RetryDecision::Retry,
        ProviderError::Transient(_) => RetryDecision::GiveUp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn transient() -> ProviderError {
        ProviderError::Transient("HTTP 503".to_string())
    }

    fn no_coverage() -> ProviderError {
        ProviderError::NoCoverage {
            latitude: 49.5,
            longitude: -120.0,
            timestamp: NaiveDate::from_ymd_opt(2023, 5, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_transient_errors_retry_within_budget() {
        assert_eq!(decide(1, 3, &transient()), RetryDecision::Retry);
        assert_eq!(decide(3, 3, &transient()), RetryDecision::Retry);
        assert_eq!(decide(4, 3, &transient()), RetryDecision::GiveUp);
    }

    #[test]
    fn test_attempt_bound_is_max_retries_plus_one() {
        let max_retries = 3;
        let mut attempts = 0;

        loop {
            attempts += 1;
            match decide(attempts, max_retries, &transient()) {
                RetryDecision::Retry => continue,
                RetryDecision::GiveUp => break,
            }
        }

        assert_eq!(attempts, max_retries + 1);
    }

    #[test]
    fn test_no_coverage_never_retries() {
        assert_eq!(decide(1, 3, &no_coverage()), RetryDecision::GiveUp);
    }

    #[test]
    fn test_zero_retry_budget_means_single_attempt() {
        assert_eq!(decide(1, 0, &transient()), RetryDecision::GiveUp);
    }
}
