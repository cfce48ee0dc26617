//! `resilient-http` builds async HTTP clients with optional retry-with-backoff.
//!
//! The entry point is [`create_client`]:
//! - `max_retries > 0` attaches a [`RetryPolicy`]; transient failures are
//!   re-issued after waiting [`RetryDelay`] between attempts
//! - `max_retries == 0` returns a plain client
//!
//! Retries are transparent: [`RequestBuilder::send`] yields the successful
//! response or a single [`ClientError`] describing the last attempt.

mod backoff;
mod client;
mod error;
mod factory;
mod options;
mod policy;
mod settings;

pub use backoff::{RetryDelay, DEFAULT_RETRY_BASE};
pub use client::{Client, RequestBuilder};
pub use error::ClientError;
pub use factory::create_client;
pub use options::{ClientConfig, TransportOptions, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_STATUSES};
pub use policy::{is_idempotent, RetryPolicy};
pub use settings::ClientSettings;

pub use reqwest::{Method, Response, StatusCode};

pub type Result<T> = std::result::Result<T, ClientError>;
