use std::{collections::BTreeSet, fmt, sync::Arc, time::Duration};

use rand::Rng;
use serde::Deserialize;

use crate::{FetchError, Method};

/// Callback invoked before each retry with `(retry_number, error, delay)`.
///
/// `retry_number` is 1 for the first retry.
pub type RetryObserver = Arc<dyn Fn(u32, &FetchError, Duration) + Send + Sync>;

/// Status codes retried when the caller does not override them.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

const JITTER_RATIO: f64 = 0.3;

/// Decides whether a failed attempt is retried and how long to wait.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Cap applied to the exponential base delay before jitter.
    pub max_delay: Duration,
    /// Doubles the base delay on each attempt when set.
    pub exponential: bool,
    pub retryable_statuses: BTreeSet<u16>,
    /// Restricts retries to GET, PUT and DELETE.
    pub only_idempotent: bool,
    /// Retries decode and transformer failures as well.
    pub retry_on_transform_error: bool,
    pub on_retry: Option<RetryObserver>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(32_000),
            exponential: true,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.into_iter().collect(),
            only_idempotent: true,
            retry_on_transform_error: false,
            on_retry: None,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("exponential", &self.exponential)
            .field("retryable_statuses", &self.retryable_statuses)
            .field("only_idempotent", &self.only_idempotent)
            .field("retry_on_transform_error", &self.retry_on_transform_error)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<observer>"))
            .finish()
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn exponential(mut self, exponential: bool) -> Self {
        self.exponential = exponential;
        self
    }

    pub fn retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    pub fn only_idempotent(mut self, only_idempotent: bool) -> Self {
        self.only_idempotent = only_idempotent;
        self
    }

    pub fn retry_on_transform_error(mut self, retry: bool) -> Self {
        self.retry_on_transform_error = retry;
        self
    }

    /// Registers a callback fired before every retry sleep.
    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, &FetchError, Duration) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    /// Whether `error`, raised by a `method` request, may be retried.
    pub fn should_retry(&self, method: Method, error: &FetchError) -> bool {
        if self.only_idempotent && !method.is_idempotent() {
            return false;
        }
        match error {
            FetchError::Config(_) => false,
            FetchError::Transport(_) => true,
            FetchError::Http { status, .. } => self.retryable_statuses.contains(status),
            FetchError::Decode(_) | FetchError::Transform { .. } => self.retry_on_transform_error,
        }
    }

    /// Un-jittered delay for the zero-based `attempt`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.initial_delay;
        }
        let factor = 1u32 << attempt.min(31);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Delay before retrying after the zero-based `attempt`, with ±30% jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt).as_secs_f64();
        let jitter = base * JITTER_RATIO * rand::thread_rng().gen_range(-1.0..=1.0);
        Duration::try_from_secs_f64((base + jitter).max(0.0)).unwrap_or(Duration::MAX)
    }

    pub(crate) fn notify(&self, retry_number: u32, error: &FetchError, delay: Duration) {
        if let Some(observer) = &self.on_retry {
            observer(retry_number, error, delay);
        }
    }
}

/// Partial retry configuration; unset fields keep [`RetryPolicy::default`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RetryOptions {
    pub max_retries: Option<u32>,
    #[serde(rename = "initialDelay")]
    pub initial_delay_ms: Option<u64>,
    #[serde(rename = "maxDelay")]
    pub max_delay_ms: Option<u64>,
    pub exponential: Option<bool>,
    pub retryable_statuses: Option<Vec<u16>>,
    pub only_idempotent: Option<bool>,
    pub retry_on_transform_error: Option<bool>,
}

impl From<RetryOptions> for RetryPolicy {
    fn from(options: RetryOptions) -> Self {
        let mut policy = RetryPolicy::default();
        if let Some(v) = options.max_retries {
            policy.max_retries = v;
        }
        if let Some(v) = options.initial_delay_ms {
            policy.initial_delay = Duration::from_millis(v);
        }
        if let Some(v) = options.max_delay_ms {
            policy.max_delay = Duration::from_millis(v);
        }
        if let Some(v) = options.exponential {
            policy.exponential = v;
        }
        if let Some(v) = options.retryable_statuses {
            policy.retryable_statuses = v.into_iter().collect();
        }
        if let Some(v) = options.only_idempotent {
            policy.only_idempotent = v;
        }
        if let Some(v) = options.retry_on_transform_error {
            policy.retry_on_transform_error = v;
        }
        policy
    }
}
