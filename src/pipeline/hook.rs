//! Hook invocation around the rest of the chain.

use std::sync::Arc;

use super::{Handler, Next};
use crate::errors::SdkResult;
use crate::hooks::Hook;
use crate::transport::{Request, Response, ResponseStream};

/// Runs the registered hooks around the remainder of the chain.
///
/// `before_request` runs for every hook in registration order, then the
/// request is delegated. Afterwards either `after_response` or `on_error`
/// runs for every hook in the same order. Errors from the chain are returned
/// unchanged. A hook that itself fails aborts the call with its own error.
pub struct HookHandler {
    hooks: Vec<Arc<dyn Hook>>,
}

impl HookHandler {
    /// Creates a hook handler over the given hooks.
    pub fn new(hooks: Vec<Arc<dyn Hook>>) -> Self {
        Self { hooks }
    }

    fn before(&self, request: &mut Request) -> SdkResult<()> {
        for hook in &self.hooks {
            hook.before_request(request)?;
        }
        Ok(())
    }

    fn after(&self, request: &Request, response: &Response) -> SdkResult<()> {
        for hook in &self.hooks {
            hook.after_response(request, response)?;
        }
        Ok(())
    }

    fn failed(&self, error: &crate::errors::SdkError, request: &Request) -> SdkResult<()> {
        let response = error.response();
        for hook in &self.hooks {
            hook.on_error(error, request, response)?;
        }
        Ok(())
    }
}

impl Handler for HookHandler {
    fn handle(&self, mut request: Request, next: Next<'_>) -> SdkResult<Response> {
        self.before(&mut request)?;

        match next.run(request.clone()) {
            Ok(response) => {
                self.after(&request, &response)?;
                Ok(response)
            }
            Err(error) => {
                self.failed(&error, &request)?;
                Err(error)
            }
        }
    }

    fn stream(&self, mut request: Request, next: Next<'_>) -> SdkResult<ResponseStream> {
        self.before(&mut request)?;

        // Stream hooks see the response head; the body has not been read yet.
        match next.stream(request.clone()) {
            Ok(stream) => {
                self.after(&request, &stream.head())?;
                Ok(stream)
            }
            Err(error) => {
                self.failed(&error, &request)?;
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for HookHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookHandler")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SdkError;
    use crate::mocks::{MockTransport, RecordingHook};
    use crate::pipeline::{RequestChain, TransportHandler};

    fn chain(hooks: Vec<Arc<dyn Hook>>, transport: MockTransport) -> RequestChain {
        RequestChain::new()
            .add_handler(HookHandler::new(hooks))
            .add_handler(TransportHandler::new(Arc::new(transport)))
    }

    #[test]
    fn test_success_runs_before_and_after_in_order() {
        let recorder = RecordingHook::new();
        let a: Arc<dyn Hook> = Arc::new(recorder.named("a"));
        let b: Arc<dyn Hook> = Arc::new(recorder.named("b"));
        let transport = MockTransport::new().with_json(200, serde_json::json!({}));

        chain(vec![a, b], transport)
            .send(Request::get("http://localhost/users"))
            .unwrap();

        assert_eq!(
            recorder.calls(),
            vec![
                "a.before_request",
                "b.before_request",
                "a.after_response",
                "b.after_response"
            ]
        );
    }

    #[test]
    fn test_error_is_observed_and_returned_unchanged() {
        let recorder = RecordingHook::new();
        let a: Arc<dyn Hook> = Arc::new(recorder.named("a"));
        let transport = MockTransport::new().with_json(
            404,
            serde_json::json!({"code": "NOT_FOUND", "message": "User not found"}),
        );

        let err = chain(vec![a], transport)
            .send(Request::get("http://localhost/users/9"))
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert_eq!(recorder.calls(), vec!["a.before_request", "a.on_error"]);
        assert_eq!(recorder.error_statuses(), vec![Some(404)]);
    }

    struct Failing;

    impl Hook for Failing {
        fn before_request(&self, _request: &mut Request) -> SdkResult<()> {
            Err(SdkError::validation("rejected by hook"))
        }
    }

    #[test]
    fn test_failing_hook_aborts_call() {
        let transport = MockTransport::new().with_json(200, serde_json::json!({}));
        let requests = transport.requests_handle();

        let err = chain(vec![Arc::new(Failing)], transport)
            .send(Request::get("http://localhost/users"))
            .unwrap_err();

        assert!(matches!(err, SdkError::Validation { .. }));
        assert!(requests.lock().unwrap().is_empty());
    }

    struct Stamp;

    impl Hook for Stamp {
        fn before_request(&self, request: &mut Request) -> SdkResult<()> {
            request.set_header("x-request-source", "hook")
        }
    }

    #[test]
    fn test_hook_can_inject_headers() {
        let transport = MockTransport::new().with_json(200, serde_json::json!({}));
        let requests = transport.requests_handle();

        chain(vec![Arc::new(Stamp)], transport)
            .send(Request::get("http://localhost/users"))
            .unwrap();

        let sent = requests.lock().unwrap();
        assert_eq!(sent[0].header("x-request-source"), Some("hook"));
    }
}
