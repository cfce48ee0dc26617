use std::time::Duration;

use reqwest::{Method, StatusCode};

use crate::RetryDelay;

/// Decides which failed attempts are re-issued and how long to wait first.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: RetryDelay,
    statuses: Vec<StatusCode>,
    retry_non_idempotent: bool,
}

/// Outcome of one failed attempt, before it becomes a [`ClientError`](crate::ClientError).
#[derive(Debug)]
pub(crate) enum Failure {
    Transport(reqwest::Error),
    Status { status: StatusCode, body: String },
}

impl Failure {
    /// One-line description without the response body.
    pub(crate) fn summary(&self) -> String {
        match self {
            Self::Transport(err) => format!("transport error: {err}"),
            Self::Status { status, .. } => format!("http status {}", status.as_u16()),
        }
    }
}

impl RetryPolicy {
    /// Policy with an empty status allow-list: only transport failures are retried.
    pub fn new(max_retries: u32, delay: RetryDelay) -> Self {
        Self {
            max_retries,
            delay,
            statuses: Vec::new(),
            retry_non_idempotent: false,
        }
    }

    /// Replaces the status allow-list.
    pub fn with_statuses<I>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = StatusCode>,
    {
        self.statuses = statuses.into_iter().collect();
        self
    }

    /// Applies timeout and status retries to POST, PATCH and CONNECT as well.
    pub fn with_retry_non_idempotent(mut self, enabled: bool) -> Self {
        self.retry_non_idempotent = enabled;
        self
    }

    /// Retries after the initial attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Statuses treated as transient.
    pub fn statuses(&self) -> &[StatusCode] {
        &self.statuses
    }

    /// Wait before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delay.delay(attempt)
    }

    /// Whether a response with `status` to a `method` request is worth re-issuing.
    pub fn should_retry_status(&self, method: &Method, status: StatusCode) -> bool {
        self.statuses.contains(&status) && self.allows_method(method)
    }

    /// Whether a transport failure of a `method` request is worth re-issuing.
    ///
    /// Connect failures never reached the server and are retried for every
    /// method. Timeouts and mid-flight failures may have had side effects.
    pub fn should_retry_transport(&self, method: &Method, err: &reqwest::Error) -> bool {
        if err.is_connect() {
            return true;
        }
        (err.is_timeout() || err.is_request() || err.is_body()) && self.allows_method(method)
    }

    pub(crate) fn should_retry(&self, method: &Method, failure: &Failure) -> bool {
        match failure {
            Failure::Transport(err) => self.should_retry_transport(method, err),
            Failure::Status { status, .. } => self.should_retry_status(method, *status),
        }
    }

    fn allows_method(&self, method: &Method) -> bool {
        self.retry_non_idempotent || is_idempotent(method)
    }
}

/// GET, HEAD, OPTIONS, PUT, DELETE and TRACE.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE | Method::TRACE
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::{Method, StatusCode};

    use super::{is_idempotent, Failure, RetryPolicy};
    use crate::RetryDelay;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, RetryDelay::fixed(Duration::from_millis(5))).with_statuses([
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
        ])
    }

    #[test]
    fn idempotent_methods() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS, Method::PUT, Method::DELETE] {
            assert!(is_idempotent(&method), "{method} should be idempotent");
        }
        for method in [Method::POST, Method::PATCH, Method::CONNECT] {
            assert!(!is_idempotent(&method), "{method} should not be idempotent");
        }
    }

    #[test]
    fn status_allow_list_applies_to_idempotent_methods() {
        let policy = policy();
        assert!(policy.should_retry_status(&Method::GET, StatusCode::SERVICE_UNAVAILABLE));
        assert!(!policy.should_retry_status(&Method::GET, StatusCode::BAD_REQUEST));
        assert!(!policy.should_retry_status(&Method::GET, StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!policy.should_retry_status(&Method::POST, StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn non_idempotent_opt_in() {
        let policy = policy().with_retry_non_idempotent(true);
        assert!(policy.should_retry_status(&Method::POST, StatusCode::BAD_GATEWAY));
        assert!(!policy.should_retry_status(&Method::POST, StatusCode::NOT_FOUND));
    }

    #[test]
    fn failure_summary_leaves_out_the_body() {
        let failure = Failure::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "<html>secret maintenance page</html>".to_owned(),
        };
        assert_eq!(failure.summary(), "http status 503");
    }

    #[tokio::test]
    async fn connect_failure_is_retried_for_every_method() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("must bind listener");
        let address = listener.local_addr().expect("must have local addr");
        drop(listener);

        let err = reqwest::Client::new()
            .post(format!("http://{address}/"))
            .send()
            .await
            .expect_err("closed port must refuse the connection");
        assert!(err.is_connect());

        let policy = policy();
        assert!(policy.should_retry_transport(&Method::POST, &err));
        assert!(policy.should_retry_transport(&Method::GET, &err));
        assert!(policy.should_retry(&Method::PATCH, &Failure::Transport(err)));
    }

    #[test]
    fn delay_is_delegated() {
        assert_eq!(policy().delay_for(2), Duration::from_millis(5));
        assert_eq!(policy().max_retries(), 3);
    }
}
