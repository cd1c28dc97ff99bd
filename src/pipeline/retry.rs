//! Retry handling.

use std::time::Duration;
use tracing::instrument;

use super::{Handler, Next};
use crate::errors::{SdkError, SdkResult};
use crate::transport::{Request, Response, ResponseStream};

/// Re-sends a request while the failure is retryable and budget remains.
///
/// The policy comes from the request itself (`Request::retry`), which carries
/// the effective configuration resolved for the call. `attempts` counts the
/// first try, so `0` and `1` both mean a single attempt. Between attempts the
/// handler sleeps for `delay_ms`, or for the server's `Retry-After` on a 429.
///
/// When every allowed attempt fails, the last error is wrapped in
/// [`SdkError::RetryExhausted`]. Non-retryable errors are returned as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetryHandler;

impl RetryHandler {
    /// Creates a retry handler.
    pub fn new() -> Self {
        Self
    }

    fn run<T, F>(&self, request: &Request, mut attempt_once: F) -> SdkResult<T>
    where
        F: FnMut(Request) -> SdkResult<T>,
    {
        let max_attempts = request.retry.max_attempts();
        let mut attempt = 1;

        loop {
            let error = match attempt_once(request.clone()) {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(error);
            }

            if attempt >= max_attempts {
                if max_attempts == 1 {
                    return Err(error);
                }
                tracing::warn!(
                    attempts = attempt,
                    error = %error,
                    "Retry budget exhausted"
                );
                return Err(SdkError::RetryExhausted {
                    attempts: attempt,
                    source: Box::new(error),
                });
            }

            let delay = self.delay_for(request, &error);
            tracing::info!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                status = ?error.status(),
                error = %error,
                "Retrying after error"
            );

            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            attempt += 1;
        }
    }

    fn delay_for(&self, request: &Request, error: &SdkError) -> Duration {
        error.retry_after().unwrap_or_else(|| request.retry.delay())
    }
}

impl Handler for RetryHandler {
    #[instrument(skip(self, request, next), fields(method = %request.method, url = %request.url))]
    fn handle(&self, request: Request, next: Next<'_>) -> SdkResult<Response> {
        self.run(&request, |attempt| next.run(attempt))
    }

    /// Only opening the stream is retried. Once chunks are flowing, a broken
    /// connection surfaces through the stream itself.
    #[instrument(skip(self, request, next), fields(method = %request.method, url = %request.url))]
    fn stream(&self, request: Request, next: Next<'_>) -> SdkResult<ResponseStream> {
        self.run(&request, |attempt| next.stream(attempt))
    }
}
