use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    StatusCode, Url,
};

use crate::{Client, ClientConfig, ClientError, Result, RetryPolicy, TransportOptions};

/// Builds a [`Client`] from `config`.
///
/// When `max_retries > 0` the client retries transient failures, waiting
/// `retry_delay(n)` before retry `n`. With `max_retries == 0` it sends every
/// request exactly once. No network activity happens here.
///
/// # Errors
///
/// [`ClientError::InvalidConfiguration`] for a negative or oversized
/// `max_retries`, an unparseable base URL, header or retry status.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use resilient_http::{create_client, ClientConfig, RetryDelay};
///
/// let client = create_client(
///     ClientConfig::default()
///         .with_max_retries(3)
///         .with_retry_delay(RetryDelay::exponential(Duration::from_millis(50))),
/// )
/// .expect("valid configuration");
/// ```
pub fn create_client(config: ClientConfig) -> Result<Client> {
    let max_retries = validate_max_retries(config.max_retries)?;
    let base_url = validate_base_url(&config.transport)?;
    let http = build_transport(&config.transport)?;

    let statuses = config
        .retry_statuses
        .iter()
        .map(|code| {
            StatusCode::from_u16(*code).map_err(|_| {
                ClientError::InvalidConfiguration(format!("invalid retry status {code}"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let retry = if max_retries > 0 {
        Some(
            RetryPolicy::new(max_retries, config.retry_delay)
                .with_statuses(statuses)
                .with_retry_non_idempotent(config.retry_non_idempotent),
        )
    } else {
        None
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(max_retries, base_url = ?base_url, "created http client");

    Ok(Client::from_parts(http, base_url, retry))
}

fn validate_max_retries(max_retries: i64) -> Result<u32> {
    if max_retries < 0 {
        return Err(ClientError::InvalidConfiguration(format!(
            "max_retries must be >= 0, got {max_retries}"
        )));
    }
    // max_retries + 1 attempts must fit in a u32.
    u32::try_from(max_retries)
        .ok()
        .filter(|retries| *retries < u32::MAX)
        .ok_or_else(|| {
            ClientError::InvalidConfiguration(format!("max_retries is too large: {max_retries}"))
        })
}

fn validate_base_url(transport: &TransportOptions) -> Result<Option<String>> {
    let Some(base_url) = transport.base_url.as_deref() else {
        return Ok(None);
    };
    let trimmed = base_url.trim();
    Url::parse(trimmed).map_err(|err| {
        ClientError::InvalidConfiguration(format!("invalid base_url '{trimmed}': {err}"))
    })?;
    Ok(Some(trimmed.to_owned()))
}

fn build_transport(transport: &TransportOptions) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().default_headers(default_headers(transport)?);

    if let Some(timeout_ms) = transport.timeout_ms {
        builder = builder.timeout(Duration::from_millis(timeout_ms));
    }
    if let Some(connect_timeout_ms) = transport.connect_timeout_ms {
        builder = builder.connect_timeout(Duration::from_millis(connect_timeout_ms));
    }
    if let Some(user_agent) = &transport.user_agent {
        builder = builder.user_agent(user_agent);
    }

    builder.build().map_err(ClientError::TransportInit)
}

fn default_headers(transport: &TransportOptions) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(transport.headers.len());
    for (name, value) in &transport.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ClientError::InvalidConfiguration(format!("invalid header name '{name}'"))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            ClientError::InvalidConfiguration(format!("invalid value for header '{name}'"))
        })?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::create_client;
    use crate::{ClientConfig, ClientError, TransportOptions};

    #[test]
    fn negative_max_retries_is_rejected() {
        let err = create_client(ClientConfig::default().with_max_retries(-1))
            .expect_err("negative retries must fail");
        assert!(matches!(err, ClientError::InvalidConfiguration(_)));
    }

    #[test]
    fn oversized_max_retries_is_rejected() {
        let err = create_client(ClientConfig::default().with_max_retries(i64::MAX))
            .expect_err("retries beyond u32 must fail");
        assert!(matches!(err, ClientError::InvalidConfiguration(_)));
    }

    #[test]
    fn retries_at_u32_max_are_rejected() {
        let err = create_client(ClientConfig::default().with_max_retries(i64::from(u32::MAX)))
            .expect_err("attempt count must fit in u32");
        assert!(matches!(err, ClientError::InvalidConfiguration(_)));

        let config = ClientConfig::default().with_max_retries(i64::from(u32::MAX - 1));
        let client = create_client(config).expect("largest representable retry count is valid");
        assert_eq!(client.max_retries(), u32::MAX - 1);
    }

    #[test]
    fn invalid_retry_status_is_rejected_with_retries_disabled() {
        let config = ClientConfig::default()
            .with_max_retries(0)
            .with_retry_statuses([42]);
        assert!(matches!(
            create_client(config),
            Err(ClientError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn positive_max_retries_attaches_policy() {
        let client =
            create_client(ClientConfig::default().with_max_retries(2)).expect("valid config");
        let policy = client.retry_policy().expect("policy must be attached");
        assert_eq!(policy.max_retries(), 2);
        assert_eq!(policy.statuses().len(), 5);
    }

    #[test]
    fn default_config_retries_eight_times() {
        let client = create_client(ClientConfig::default()).expect("valid config");
        assert_eq!(client.max_retries(), 8);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let config = ClientConfig::default().with_transport(TransportOptions {
            base_url: Some("not a url".to_owned()),
            ..TransportOptions::default()
        });
        assert!(matches!(
            create_client(config),
            Err(ClientError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn invalid_header_is_rejected() {
        let config = ClientConfig::default().with_transport(TransportOptions {
            headers: vec![("bad header".to_owned(), "x".to_owned())],
            ..TransportOptions::default()
        });
        assert!(matches!(
            create_client(config),
            Err(ClientError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn invalid_retry_status_is_rejected() {
        let config = ClientConfig::default().with_retry_statuses([42]);
        assert!(matches!(
            create_client(config),
            Err(ClientError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn base_url_is_trimmed() {
        let config = ClientConfig::default().with_transport(TransportOptions {
            base_url: Some(" https://api.test/v1 ".to_owned()),
            ..TransportOptions::default()
        });
        let client = create_client(config).expect("valid config");
        assert_eq!(client.base_url(), Some("https://api.test/v1"));
    }
}
