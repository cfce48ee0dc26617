//! Plain-data client settings loadable from JSON or the environment.

use std::{collections::BTreeMap, str::FromStr, time::Duration};

use serde::Deserialize;

use crate::{ClientConfig, ClientError, Result, RetryDelay, TransportOptions};

const ENV_PREFIX: &str = "RESILIENT_HTTP_";

/// Serializable counterpart of [`ClientConfig`].
///
/// Every field is optional; missing fields keep the [`ClientConfig`] defaults.
///
/// ```
/// use resilient_http::ClientSettings;
///
/// let settings = ClientSettings::from_json(r#"{"max_retries": 2, "retry_base_ms": 50}"#)
///     .expect("valid settings");
/// assert_eq!(settings.into_config().max_retries, 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSettings {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub headers: BTreeMap<String, String>,
    pub user_agent: Option<String>,
    pub max_retries: Option<i64>,
    /// Base of the exponential backoff in milliseconds.
    pub retry_base_ms: Option<u64>,
    pub retry_statuses: Option<Vec<u16>>,
    pub retry_non_idempotent: Option<bool>,
}

impl ClientSettings {
    /// Parses settings from a JSON object; unknown fields are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| ClientError::InvalidConfiguration(format!("invalid settings: {err}")))
    }

    /// Reads `RESILIENT_HTTP_*` environment variables.
    ///
    /// Reads:
    /// - `RESILIENT_HTTP_BASE_URL`
    /// - `RESILIENT_HTTP_TIMEOUT_MS`, `RESILIENT_HTTP_CONNECT_TIMEOUT_MS`
    /// - `RESILIENT_HTTP_USER_AGENT`
    /// - `RESILIENT_HTTP_MAX_RETRIES`, `RESILIENT_HTTP_RETRY_BASE_MS`
    /// - `RESILIENT_HTTP_RETRY_STATUSES` (comma separated, e.g. `502,503`)
    /// - `RESILIENT_HTTP_RETRY_NON_IDEMPOTENT` (`true` / `false`)
    ///
    /// Unset or empty variables are ignored.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .map(|value| (key, value))
        };

        let retry_statuses = var("RETRY_STATUSES")
            .map(|(key, value)| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|code| !code.is_empty())
                    .map(|code| parse_value(&key, code))
                    .collect::<Result<Vec<u16>>>()
            })
            .transpose()?;

        Ok(Self {
            base_url: var("BASE_URL").map(|(_, value)| value),
            timeout_ms: parse_var(var("TIMEOUT_MS"))?,
            connect_timeout_ms: parse_var(var("CONNECT_TIMEOUT_MS"))?,
            headers: BTreeMap::new(),
            user_agent: var("USER_AGENT").map(|(_, value)| value),
            max_retries: parse_var(var("MAX_RETRIES"))?,
            retry_base_ms: parse_var(var("RETRY_BASE_MS"))?,
            retry_statuses,
            retry_non_idempotent: parse_var(var("RETRY_NON_IDEMPOTENT"))?,
        })
    }

    /// Converts into a [`ClientConfig`]; validation happens in
    /// [`create_client`](crate::create_client).
    pub fn into_config(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            transport: TransportOptions {
                base_url: self.base_url,
                timeout_ms: self.timeout_ms,
                connect_timeout_ms: self.connect_timeout_ms,
                headers: self.headers.into_iter().collect(),
                user_agent: self.user_agent,
            },
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_delay: self
                .retry_base_ms
                .map(|ms| RetryDelay::exponential(Duration::from_millis(ms)))
                .unwrap_or(defaults.retry_delay),
            retry_statuses: self.retry_statuses.unwrap_or(defaults.retry_statuses),
            retry_non_idempotent: self
                .retry_non_idempotent
                .unwrap_or(defaults.retry_non_idempotent),
        }
    }
}

fn parse_var<T: FromStr>(var: Option<(String, String)>) -> Result<Option<T>> {
    var.map(|(key, value)| parse_value(&key, &value)).transpose()
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        ClientError::InvalidConfiguration(format!("invalid value for {key}: '{value}'"))
    })
}
