//! Billing configuration.
//!
//! Every knob of the pipeline is injectable; `from_env` reads overrides
//! from the environment and falls back to the documented defaults.

use std::time::Duration;

use crate::breaker::CircuitBreakerConfig;

#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Invoices fetched per page when walking a filtered invoice set
    pub page_size: i64,
    /// Transient-failure retries per invoice (total tries = retries + 1)
    pub max_retries: u32,
    /// Backoff before retry k is `min(backoff_base * k, backoff_max)`
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// How many invoices of one batch are charged concurrently
    pub charge_concurrency: usize,
    /// Circuit breaker around the charge call
    pub breaker: CircuitBreakerConfig,
    /// Age after which an unresolved `STARTED_PAYMENT` fence is reclaimed
    pub fence_reclaim_after: Duration,
    /// Six-field cron expression driving the recurring fan-out
    pub cron: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_retries: 3,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_millis(1000),
            charge_concurrency: 8,
            breaker: CircuitBreakerConfig::default(),
            fence_reclaim_after: Duration::from_secs(3600),
            // Midnight on the first of every month
            cron: "0 0 0 1 * *".to_string(),
        }
    }
}

impl BillingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            page_size: env_parse("BILLING_PAGE_SIZE", defaults.page_size),
            max_retries: env_parse("BILLING_MAX_RETRIES", defaults.max_retries),
            backoff_base: Duration::from_millis(env_parse(
                "BILLING_BACKOFF_BASE_MS",
                defaults.backoff_base.as_millis() as u64,
            )),
            backoff_max: Duration::from_millis(env_parse(
                "BILLING_BACKOFF_MAX_MS",
                defaults.backoff_max.as_millis() as u64,
            )),
            charge_concurrency: env_parse(
                "BILLING_CHARGE_CONCURRENCY",
                defaults.charge_concurrency,
            ),
            breaker: CircuitBreakerConfig {
                failure_threshold: env_parse(
                    "BILLING_BREAKER_FAILURE_THRESHOLD",
                    defaults.breaker.failure_threshold,
                ),
                success_threshold: env_parse(
                    "BILLING_BREAKER_SUCCESS_THRESHOLD",
                    defaults.breaker.success_threshold,
                ),
                cooldown: Duration::from_secs(env_parse(
                    "BILLING_BREAKER_COOLDOWN_SECS",
                    defaults.breaker.cooldown.as_secs(),
                )),
            },
            fence_reclaim_after: Duration::from_secs(env_parse(
                "BILLING_FENCE_RECLAIM_AFTER_SECS",
                defaults.fence_reclaim_after.as_secs(),
            )),
            cron: std::env::var("BILLING_CRON").unwrap_or(defaults.cron),
        }
    }

    /// Delay before retry `attempt` (1-based), linear growth with a ceiling
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        (self.backoff_base * attempt).min(self.backoff_max)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
