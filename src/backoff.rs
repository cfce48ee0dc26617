use std::{fmt, sync::Arc, time::Duration};

/// Base delay of the default exponential backoff.
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_millis(100);

// Larger exponents would only saturate.
const MAX_EXPONENT: u32 = 16;

/// Maps a 1-based retry attempt number to the wait before that retry.
///
/// The function must be pure: it is called once per retry, with strictly
/// increasing attempt numbers starting at 1.
#[derive(Clone)]
pub struct RetryDelay(Arc<dyn Fn(u32) -> Duration + Send + Sync>);

impl RetryDelay {
    /// Wraps a custom delay function.
    pub fn new<F>(delay_fn: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self(Arc::new(delay_fn))
    }

    /// Exponential backoff: `base * 2^attempt`.
    ///
    /// Example with a 100 ms base: 200 ms, 400 ms, 800 ms, ...
    pub fn exponential(base: Duration) -> Self {
        Self::new(move |attempt| {
            let multiplier = 1u32 << attempt.min(MAX_EXPONENT);
            base.saturating_mul(multiplier)
        })
    }

    /// The same delay before every retry.
    pub fn fixed(delay: Duration) -> Self {
        Self::new(move |_| delay)
    }

    /// Retries immediately.
    pub fn none() -> Self {
        Self::fixed(Duration::ZERO)
    }

    /// Returns the wait before retry number `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        (self.0)(attempt)
    }
}

impl Default for RetryDelay {
    fn default() -> Self {
        Self::exponential(DEFAULT_RETRY_BASE)
    }
}

impl fmt::Debug for RetryDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RetryDelay").field(&"<fn>").finish()
    }
}
