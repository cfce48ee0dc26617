use std::fmt;

use crate::RetryDelay;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: i64 = 8;

/// Statuses retried by default: rate limiting and transient server errors.
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Settings passed through to the underlying transport.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    /// Prefix for relative request URLs.
    pub base_url: Option<String>,
    /// Total per-request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect phase timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Headers sent with every request.
    pub headers: Vec<(String, String)>,
    /// `User-Agent` header value; reqwest sends none by default.
    pub user_agent: Option<String>,
}

impl fmt::Debug for TransportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| {
                if is_sensitive_header(name) {
                    (name.as_str(), "<redacted>")
                } else {
                    (name.as_str(), value.as_str())
                }
            })
            .collect();

        f.debug_struct("TransportOptions")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("headers", &headers)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn is_sensitive_header(name: &str) -> bool {
    ["authorization", "proxy-authorization", "cookie", "x-api-key"]
        .iter()
        .any(|sensitive| name.eq_ignore_ascii_case(sensitive))
}

/// Input to [`create_client`](crate::create_client).
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Passed through to the underlying transport.
    pub transport: TransportOptions,
    /// Maximum number of retries after the initial attempt; `0` disables retry.
    ///
    /// Signed so that values from external sources can be rejected instead of
    /// wrapping.
    pub max_retries: i64,
    /// Wait before each retry.
    pub retry_delay: RetryDelay,
    /// HTTP statuses treated as transient.
    pub retry_statuses: Vec<u16>,
    /// Also retry timeouts and retryable statuses for POST, PATCH and CONNECT.
    pub retry_non_idempotent: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: TransportOptions::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: RetryDelay::default(),
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
            retry_non_idempotent: false,
        }
    }
}

impl ClientConfig {
    /// Replaces the transport settings.
    pub fn with_transport(mut self, transport: TransportOptions) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the retry count; negative values are rejected by the factory.
    pub fn with_max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the wait before each retry.
    pub fn with_retry_delay(mut self, retry_delay: RetryDelay) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Replaces the retryable status allow-list.
    pub fn with_retry_statuses<I>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.retry_statuses = statuses.into_iter().collect();
        self
    }

    /// Enables retry of timeouts and retryable statuses for non-idempotent methods.
    pub fn with_retry_non_idempotent(mut self, enabled: bool) -> Self {
        self.retry_non_idempotent = enabled;
        self
    }
}
