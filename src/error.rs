/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Rejected client configuration, such as a negative retry count.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The underlying `reqwest` client could not be built.
    #[error("failed to build transport: {0}")]
    TransportInit(#[source] reqwest::Error),
    /// The request could not be built (bad URL, unserializable body).
    #[error("invalid request: {0}")]
    InvalidRequest(#[source] reqwest::Error),
    /// Network or request execution error from `reqwest` on the last attempt.
    #[error("transport error after {attempts} attempt(s): {source}")]
    Transport {
        source: reqwest::Error,
        /// Total number of attempts issued, including the first one.
        attempts: u32,
    },
    /// Non-success HTTP status code with raw response body of the last attempt.
    #[error("http error {status} after {attempts} attempt(s): {body}")]
    Http {
        status: u16,
        body: String,
        /// Total number of attempts issued, including the first one.
        attempts: u32,
    },
    /// Response decoding error.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ClientError {
    /// Number of attempts issued before this error surfaced, if a request was sent.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Transport { attempts, .. } | Self::Http { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// HTTP status of the last response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the last attempt failed because a transport timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::ClientError;

    #[test]
    fn http_error_reports_status_and_attempts() {
        let err = ClientError::Http {
            status: 503,
            body: "unavailable".to_owned(),
            attempts: 3,
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.attempts(), Some(3));
        assert!(!err.is_timeout());
        assert_eq!(
            err.to_string(),
            "http error 503 after 3 attempt(s): unavailable"
        );
    }

    #[test]
    fn configuration_error_has_no_attempts() {
        let err = ClientError::InvalidConfiguration("max_retries must be >= 0".to_owned());
        assert_eq!(err.attempts(), None);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn invalid_request_keeps_its_cause() {
        let cause = reqwest::Client::new()
            .get("not a url")
            .build()
            .expect_err("relative url without base must not build");
        let err = ClientError::InvalidRequest(cause);
        assert!(err.source().is_some());
    }
}
