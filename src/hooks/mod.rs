//! Request lifecycle hooks.
//!
//! A [`Hook`] observes each call as it passes through the pipeline. Hooks are
//! registered on the client builder and invoked in registration order by the
//! hook handler, which sits outside the retry handler: a hook sees one
//! `before_request` and one outcome per call, however many attempts it took.
//!
//! Hooks must not fail under normal operation. An error returned from a
//! callback aborts the in-flight call and is surfaced to the caller in place
//! of the call's own result.

use crate::errors::{SdkError, SdkResult};
use crate::transport::{Request, Response};

/// Interception point around a call.
///
/// Every callback defaults to doing nothing.
pub trait Hook: Send + Sync {
    /// Called before the request is sent. May adjust headers or the body.
    fn before_request(&self, request: &mut Request) -> SdkResult<()> {
        let _ = request;
        Ok(())
    }

    /// Called with the final successful response.
    fn after_response(&self, request: &Request, response: &Response) -> SdkResult<()> {
        let _ = (request, response);
        Ok(())
    }

    /// Called with the final error. `response` is set when the server answered.
    fn on_error(
        &self,
        error: &SdkError,
        request: &Request,
        response: Option<&Response>,
    ) -> SdkResult<()> {
        let _ = (error, request, response);
        Ok(())
    }
}

/// A hook that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl Hook for NoopHook {}

/// A hook that reports each call through `tracing`.
///
/// The `authorization` header is never logged.
#[derive(Debug, Clone)]
pub struct TracingHook {
    /// Log outgoing requests.
    pub log_requests: bool,
    /// Log successful responses.
    pub log_responses: bool,
    /// Log failures.
    pub log_errors: bool,
}

impl Default for TracingHook {
    fn default() -> Self {
        Self {
            log_requests: true,
            log_responses: true,
            log_errors: true,
        }
    }
}

impl TracingHook {
    /// Creates a hook logging requests, responses and errors.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Header lines safe to log. Authorization and values marked sensitive are
/// replaced with `[REDACTED]`.
fn visible_headers(request: &Request) -> Vec<String> {
    request
        .headers
        .iter()
        .map(|(name, value)| {
            if name == http::header::AUTHORIZATION || value.is_sensitive() {
                format!("{}: [REDACTED]", name)
            } else {
                format!("{}: {}", name, value.to_str().unwrap_or("<binary>"))
            }
        })
        .collect()
}

impl Hook for TracingHook {
    fn before_request(&self, request: &mut Request) -> SdkResult<()> {
        if self.log_requests {
            tracing::debug!(
                method = %request.method,
                url = %request.url,
                headers = ?visible_headers(request),
                "Sending request"
            );
        }
        Ok(())
    }

    fn after_response(&self, request: &Request, response: &Response) -> SdkResult<()> {
        if self.log_responses {
            tracing::debug!(
                method = %request.method,
                url = %request.url,
                status = response.status,
                "Request completed"
            );
        }
        Ok(())
    }

    fn on_error(
        &self,
        error: &SdkError,
        request: &Request,
        response: Option<&Response>,
    ) -> SdkResult<()> {
        if self.log_errors {
            tracing::warn!(
                method = %request.method,
                url = %request.url,
                status = ?response.map(|r| r.status),
                error = %error,
                "Request failed"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ApiKeyHeader, AuthProvider};
    use crate::transport::ResponseBody;
    use http::HeaderMap;
    use secrecy::SecretString;

    #[test]
    fn test_noop_hook_accepts_everything() {
        let hook = NoopHook;
        let mut request = Request::get("http://localhost/users");
        let response = Response::new(200, HeaderMap::new(), ResponseBody::Empty);

        assert!(hook.before_request(&mut request).is_ok());
        assert!(hook.after_response(&request, &response).is_ok());
        assert!(hook
            .on_error(&SdkError::validation("x"), &request, None)
            .is_ok());
    }

    #[test]
    fn test_tracing_hook_redacts_authorization() {
        let request = Request::get("http://localhost/users")
            .with_header("authorization", "Bearer secret-token")
            .unwrap()
            .with_header("accept", "application/json")
            .unwrap();

        let headers = visible_headers(&request);

        assert!(headers.contains(&"authorization: [REDACTED]".to_string()));
        assert!(headers.contains(&"accept: application/json".to_string()));
        assert!(!headers.iter().any(|h| h.contains("secret-token")));
    }

    #[test]
    fn test_tracing_hook_redacts_api_key_header() {
        let key = SecretString::new("super-secret-key".to_string());
        let auth = ApiKeyHeader::new("x-api-key", key).unwrap();
        let mut request = Request::get("http://localhost/users");
        auth.apply_auth(&mut request.headers).unwrap();

        let headers = visible_headers(&request);

        assert_eq!(headers, vec!["x-api-key: [REDACTED]".to_string()]);
    }

    #[test]
    fn test_tracing_hook_never_fails() {
        let hook = TracingHook::new();
        let mut request = Request::get("http://localhost/users");
        let response = Response::new(503, HeaderMap::new(), ResponseBody::Empty);

        assert!(hook.before_request(&mut request).is_ok());
        assert!(hook.after_response(&request, &response).is_ok());
        let error = SdkError::http(response.clone());
        assert!(hook.on_error(&error, &request, Some(&response)).is_ok());
    }
}
