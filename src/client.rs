use std::{fmt, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::sleep;

use crate::{
    policy::{Failure, RetryPolicy},
    ClientError, Result,
};

#[derive(Clone)]
/// HTTP client with optional transparent retry.
///
/// Built by [`create_client`](crate::create_client). Cloning is cheap: clones
/// share the connection pool and the retry policy.
pub struct Client {
    http: reqwest::Client,
    base_url: Option<String>,
    retry: Option<RetryPolicy>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Client {
    pub(crate) fn from_parts(
        http: reqwest::Client,
        base_url: Option<String>,
        retry: Option<RetryPolicy>,
    ) -> Self {
        Self {
            http,
            base_url,
            retry,
        }
    }

    /// Creates a client from [`ClientConfig::default`](crate::ClientConfig).
    pub fn new() -> Result<Self> {
        crate::create_client(crate::ClientConfig::default())
    }

    /// Base URL prepended to relative request URLs.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// The attached retry policy, `None` when retry is disabled.
    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    /// Retries issued at most per request after the initial attempt.
    pub fn max_retries(&self) -> u32 {
        self.retry.as_ref().map_or(0, RetryPolicy::max_retries)
    }

    /// Starts a request. Relative `url`s are joined onto the base URL.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let url = self.resolve_url(url);
        RequestBuilder {
            client: self.clone(),
            inner: self.http.request(method, url),
        }
    }

    /// Starts a GET request.
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Starts a POST request. Not retried on timeouts or statuses unless enabled.
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Starts a PUT request.
    pub fn put(&self, url: &str) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Starts a HEAD request.
    pub fn head(&self, url: &str) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// GETs `url` and decodes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.get(url).send_json().await
    }

    fn resolve_url(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if !is_absolute(url) => join_url(base, url),
            _ => url.to_owned(),
        }
    }

    /// Sends `request`, re-issuing it while the retry policy allows.
    ///
    /// Returns the first successful response, or an error describing the
    /// last attempt.
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        let method = request.method().clone();
        let max_retries = self.max_retries();
        let mut current = request;
        let mut attempt: u32 = 0;

        loop {
            // Cannot overflow: the factory caps max_retries below u32::MAX.
            attempt += 1;
            // reqwest consumes the request, so keep a copy for the next try.
            // Streaming bodies cannot be cloned and are sent once.
            let replay = if attempt <= max_retries {
                current.try_clone()
            } else {
                None
            };

            let failure = match self.http.execute(current).await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    // Classified by status even if the body is cut short.
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|err| format!("<failed to read body: {err}>"));
                    Failure::Status { status, body }
                }
                Err(err) => Failure::Transport(err),
            };

            match (replay, &self.retry) {
                (Some(next), Some(policy)) if policy.should_retry(&method, &failure) => {
                    let delay = policy.delay_for(attempt);

                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        method = %method,
                        attempt,
                        max_retries,
                        delay = ?delay,
                        failure = %failure.summary(),
                        "request failed, retrying"
                    );

                    sleep(delay).await;
                    current = next;
                }
                _ => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        method = %method,
                        attempts = attempt,
                        failure = %failure.summary(),
                        "request failed, not retrying"
                    );

                    return Err(into_error(failure, attempt));
                }
            }
        }
    }
}

fn into_error(failure: Failure, attempts: u32) -> ClientError {
    match failure {
        Failure::Transport(source) => ClientError::Transport { source, attempts },
        Failure::Status { status, body } => ClientError::Http {
            status: status.as_u16(),
            body,
            attempts,
        },
    }
}

fn is_absolute(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_owned();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Builder for a single request issued through a [`Client`].
#[derive(Debug)]
pub struct RequestBuilder {
    client: Client,
    inner: reqwest::RequestBuilder,
}

impl RequestBuilder {
    /// Adds a header to this request.
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.inner = self.inner.header(key, value);
        self
    }

    /// Merges `headers` into this request's headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.inner = self.inner.headers(headers);
        self
    }

    /// Sets `Authorization: Bearer <token>`.
    pub fn bearer_auth<T: fmt::Display>(mut self, token: T) -> Self {
        self.inner = self.inner.bearer_auth(token);
        self
    }

    /// Appends URL-encoded query parameters.
    pub fn query<T: Serialize + ?Sized>(mut self, query: &T) -> Self {
        self.inner = self.inner.query(query);
        self
    }

    /// Sets the request body. Streaming bodies are never retried.
    pub fn body<T: Into<reqwest::Body>>(mut self, body: T) -> Self {
        self.inner = self.inner.body(body);
        self
    }

    /// Serializes `json` as the request body and sets the content type.
    pub fn json<T: Serialize + ?Sized>(mut self, json: &T) -> Self {
        self.inner = self.inner.json(json);
        self
    }

    /// Per-attempt timeout, overriding the client-wide one.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.timeout(timeout);
        self
    }

    /// Sends the request, retrying transparently if the client has a policy.
    ///
    /// Dropping the returned future cancels the request together with any
    /// pending retry wait.
    pub async fn send(self) -> Result<reqwest::Response> {
        let request = self.inner.build().map_err(ClientError::InvalidRequest)?;
        self.client.execute(request).await
    }

    /// Sends the request and decodes a successful response body as JSON.
    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T> {
        let response = self.send().await?;
        let body = response
            .text()
            .await
            .map_err(|err| ClientError::Decode(format!("failed to read response body: {err}")))?;

        serde_json::from_str(&body).map_err(|err| {
            ClientError::Decode(format!("invalid response JSON: {err}; body: {body}"))
        })
    }
}
