use std::time::Duration;

/// Tunables of the accrual refresh engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Concurrent lookups against the accrual service.
    pub workers: usize,
    /// Time between two scans for pending orders.
    pub poll_interval: Duration,
    /// Pause after a 429 without a usable `Retry-After`.
    pub rate_limit_pause: Duration,
    /// Upper bound for any rate limit pause, whatever the service asks for.
    pub max_rate_limit_pause: Duration,
    /// Capacity of the scheduler to worker queue.
    pub queue_capacity: usize,
    /// Results the ledger writer applies in one transaction at most.
    pub batch_size: usize,
    /// Timeout of a single request to the accrual service.
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            poll_interval: Duration::from_secs(2),
            rate_limit_pause: Duration::from_secs(2),
            max_rate_limit_pause: Duration::from_secs(60),
            queue_capacity: crate::events::DEFAULT_CHANNEL_BUFFER,
            batch_size: 64,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    /// Clamp values that would stall the pipeline. Zero workers or a zero
    /// capacity channel never make progress.
    pub fn sanitized(mut self) -> Self {
        self.workers = self.workers.max(1);
        self.queue_capacity = self.queue_capacity.max(1);
        self.batch_size = self.batch_size.max(1);
        if self.poll_interval.is_zero() {
            self.poll_interval = Duration::from_millis(1);
        }
        if self.max_rate_limit_pause < self.rate_limit_pause {
            self.max_rate_limit_pause = self.rate_limit_pause;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_contract() {
        let config = EngineConfig::default();
        assert_eq!(config.workers, 10);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.rate_limit_pause, Duration::from_secs(2));
    }

    #[test]
    fn test_sanitized_clamps_zeroes() {
        let config = EngineConfig {
            workers: 0,
            queue_capacity: 0,
            batch_size: 0,
            poll_interval: Duration::ZERO,
            rate_limit_pause: Duration::from_secs(5),
            max_rate_limit_pause: Duration::from_secs(1),
            request_timeout: Duration::from_secs(1),
        }
        .sanitized();
        assert_eq!(config.workers, 1);
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.batch_size, 1);
        assert!(!config.poll_interval.is_zero());
        assert_eq!(config.max_rate_limit_pause, Duration::from_secs(5));
    }
}
