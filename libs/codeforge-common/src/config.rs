// Evaluation pipeline configuration, sourced from the environment.

use std::time::Duration;

/// Tunables for the judge client and the result poller.
///
/// Every knob has a default that works against a local judge instance;
/// `from_env` overrides from the environment the same way the binaries
/// pick up `REDIS_URL`.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Base URL of the judge service, e.g. "https://judge0-ce.p.rapidapi.com"
    pub judge_url: String,
    /// Optional auth token sent as X-Auth-Token on every judge call
    pub judge_api_key: Option<String>,
    /// Fixed delay between successful polls while results are pending
    pub poll_interval: Duration,
    /// First backoff delay after a failed poll; doubles per consecutive failure
    pub poll_backoff_base: Duration,
    /// Upper bound on a single backoff delay
    pub poll_backoff_cap: Duration,
    /// Consecutive poll failures tolerated before giving up
    pub max_poll_failures: u32,
    /// Wall-clock budget for one whole evaluation's polling phase
    pub eval_timeout: Duration,
    /// When true, failed cases' runtime/memory also count toward the
    /// submission totals; by default only accepted cases do.
    pub count_failed_case_stats: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            judge_url: "http://127.0.0.1:2358".to_string(),
            judge_api_key: None,
            poll_interval: Duration::from_millis(1000),
            poll_backoff_base: Duration::from_millis(500),
            poll_backoff_cap: Duration::from_secs(8),
            max_poll_failures: 5,
            eval_timeout: Duration::from_secs(120),
            count_failed_case_stats: false,
        }
    }
}

impl EvalConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            judge_url: std::env::var("JUDGE_URL").unwrap_or(defaults.judge_url),
            judge_api_key: std::env::var("JUDGE_API_KEY").ok().filter(|k| !k.is_empty()),
            poll_interval: env_millis("JUDGE_POLL_INTERVAL_MS", defaults.poll_interval),
            poll_backoff_base: env_millis("JUDGE_BACKOFF_BASE_MS", defaults.poll_backoff_base),
            poll_backoff_cap: env_millis("JUDGE_BACKOFF_CAP_MS", defaults.poll_backoff_cap),
            max_poll_failures: env_parse("JUDGE_MAX_POLL_FAILURES", defaults.max_poll_failures),
            eval_timeout: env_secs("EVAL_TIMEOUT_SECS", defaults.eval_timeout),
            count_failed_case_stats: env_parse(
                "EVAL_COUNT_FAILED_CASE_STATS",
                defaults.count_failed_case_stats,
            ),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_millis(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
