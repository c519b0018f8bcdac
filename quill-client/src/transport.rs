use rand::Rng;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use shared::config::Config;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

/// Failure taxonomy for `RetryingTransport`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: AttemptError,
    },
}

/// How a single attempt failed.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("server error: {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Network(#[from] reqwest::Error),
}

/// Retry and backoff tuning for every call made through the transport.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries on top of the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Ceiling on the exponential term, before jitter.
    pub max_delay: Duration,
    /// Budget for one attempt; exceeding it aborts that attempt.
    pub attempt_timeout: Duration,
    /// Whole calls slower than this are logged.
    pub slow_threshold: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            attempt_timeout: Duration::from_millis(config.request_timeout_ms),
            slow_threshold: Duration::from_millis(config.slow_request_threshold_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(10_000),
            attempt_timeout: Duration::from_secs(30),
            slow_threshold: Duration::from_millis(3_000),
        }
    }
}

/// HTTP transport that retries transient failures with exponential
/// backoff.
///
/// 2xx and 3xx responses are returned as-is. 4xx responses are also
/// returned, without retrying: a client error reads the same on every
/// attempt, and interpreting it is the caller's job. 5xx responses and
/// network failures (timeouts included) are retried up to the budget.
#[derive(Clone)]
pub struct RetryingTransport {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingTransport {
    pub fn new(policy: RetryPolicy) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(policy.attempt_timeout)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self { client, policy })
    }

    /// Send with retries. `prepare` customizes each attempt's request;
    /// it runs once per attempt because a request is consumed on send.
    pub async fn execute<F>(
        &self,
        method: Method,
        url: &str,
        prepare: F,
    ) -> Result<Response, TransportError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let started = Instant::now();
        let result = self.run(&method, url, &prepare).await;

        let elapsed = started.elapsed();
        if elapsed >= self.policy.slow_threshold {
            warn!("Slow request to {}: {}ms", url, elapsed.as_millis());
        }

        result
    }

    /// GET with no request customization.
    pub async fn get(&self, url: &str) -> Result<Response, TransportError> {
        self.execute(Method::GET, url, |req| req).await
    }

    /// Escape hatch for calls that must not retry (liveness probes).
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    async fn run<F>(&self, method: &Method, url: &str, prepare: &F) -> Result<Response, TransportError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match self.attempt(method, url, prepare).await {
                Ok(response) => return Ok(response),
                Err(cause) if attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = backoff_delay(attempt - 1, &self.policy);
                    warn!(
                        "Attempt {} against {} failed ({}), retrying in {:?}",
                        attempt, url, cause, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(cause) => {
                    return Err(TransportError::RetriesExhausted {
                        attempts: attempt + 1,
                        last: cause,
                    });
                }
            }
        }
    }

    async fn attempt<F>(
        &self,
        method: &Method,
        url: &str,
        prepare: &F,
    ) -> Result<Response, AttemptError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let request = prepare(self.client.request(method.clone(), url));
        let response = request.send().await?;

        if response.status().is_server_error() {
            return Err(AttemptError::Status(response.status()));
        }

        Ok(response)
    }
}

/// Backoff before the retry that follows failed attempt `attempt`
/// (0-based): exponential in the attempt number, capped, plus up to a
/// second of jitter so synchronized clients spread out.
fn backoff_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    let exponential = policy
        .base_delay
        .saturating_mul(2u32.saturating_pow(attempt));

    let jitter = rand::rng().random_range(0..1000);
    exponential.min(policy.max_delay) + Duration::from_millis(jitter)
}
