use std::str::FromStr;

/// Runtime configuration, loaded once from environment variables.
///
/// Every field has a default so the workspace runs with no environment at
/// all; `QUILL_*` variables override individual values.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backend API, no trailing slash.
    pub api_base_url: String,
    /// Per-attempt request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Retry budget on top of the first attempt.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Calls slower than this are logged as slow.
    pub slow_request_threshold_ms: u64,
    pub cache_default_ttl_ms: u64,
    pub cache_profile_ttl_ms: u64,
    pub cache_credits_ttl_ms: u64,
    /// Directory for the durable store.
    pub data_dir: String,
    /// Port the edge worker listens on.
    pub edge_port: u16,
    /// Origin server the edge worker forwards misses to.
    pub origin_url: String,
    /// Value for Access-Control-Allow-Origin headers.
    pub allowed_origin: String,
}

impl Config {
    const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
    const DEFAULT_ORIGIN_URL: &str = "http://localhost:5000";
    const DEFAULT_DATA_DIR: &str = "./data";
    const DEFAULT_ALLOWED_ORIGIN: &str = "*";

    const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
    const DEFAULT_MAX_RETRIES: u32 = 3;
    const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1_000;
    const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;
    const DEFAULT_SLOW_REQUEST_THRESHOLD_MS: u64 = 3_000;
    const DEFAULT_CACHE_DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;
    const DEFAULT_CACHE_PROFILE_TTL_MS: u64 = 10 * 60 * 1000;
    const DEFAULT_CACHE_CREDITS_TTL_MS: u64 = 2 * 60 * 1000;
    const DEFAULT_EDGE_PORT: u16 = 8080;

    pub fn from_env() -> Self {
        Self {
            api_base_url: std::env::var("QUILL_API_BASE_URL")
                .unwrap_or_else(|_| Self::DEFAULT_API_BASE_URL.to_string()),
            request_timeout_ms: env_parse(
                "QUILL_REQUEST_TIMEOUT_MS",
                Self::DEFAULT_REQUEST_TIMEOUT_MS,
            ),
            max_retries: env_parse("QUILL_MAX_RETRIES", Self::DEFAULT_MAX_RETRIES),
            retry_base_delay_ms: env_parse(
                "QUILL_RETRY_BASE_DELAY_MS",
                Self::DEFAULT_RETRY_BASE_DELAY_MS,
            ),
            retry_max_delay_ms: env_parse(
                "QUILL_RETRY_MAX_DELAY_MS",
                Self::DEFAULT_RETRY_MAX_DELAY_MS,
            ),
            slow_request_threshold_ms: env_parse(
                "QUILL_SLOW_REQUEST_THRESHOLD_MS",
                Self::DEFAULT_SLOW_REQUEST_THRESHOLD_MS,
            ),
            cache_default_ttl_ms: env_parse(
                "QUILL_CACHE_DEFAULT_TTL_MS",
                Self::DEFAULT_CACHE_DEFAULT_TTL_MS,
            ),
            cache_profile_ttl_ms: env_parse(
                "QUILL_CACHE_PROFILE_TTL_MS",
                Self::DEFAULT_CACHE_PROFILE_TTL_MS,
            ),
            cache_credits_ttl_ms: env_parse(
                "QUILL_CACHE_CREDITS_TTL_MS",
                Self::DEFAULT_CACHE_CREDITS_TTL_MS,
            ),
            data_dir: std::env::var("QUILL_DATA_DIR")
                .unwrap_or_else(|_| Self::DEFAULT_DATA_DIR.to_string()),
            edge_port: env_parse("QUILL_EDGE_PORT", Self::DEFAULT_EDGE_PORT),
            origin_url: std::env::var("QUILL_ORIGIN_URL")
                .unwrap_or_else(|_| Self::DEFAULT_ORIGIN_URL.to_string()),
            allowed_origin: std::env::var("QUILL_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| Self::DEFAULT_ALLOWED_ORIGIN.to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Read a numeric variable, falling back to the default when it is unset
/// or unparsable.
fn env_parse<T: FromStr + Copy>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
