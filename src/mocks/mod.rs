//! Mock implementations for testing.
//!
//! Provides a scripted transport and a recording hook so the pipeline can be
//! exercised without network I/O.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::errors::{SdkError, SdkResult};
use crate::hooks::Hook;
use crate::transport::{
    ChunkFraming, HttpTransport, Request, Response, ResponseBody, StreamingResponse,
    TransportError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A scripted reply.
#[derive(Debug, Clone)]
enum MockReply {
    Response(Response),
    Chunks {
        status: u16,
        headers: HeaderMap,
        chunks: Vec<Result<Bytes, TransportError>>,
    },
    Failure(TransportError),
}

/// Mock HTTP transport for testing.
///
/// Replies are served in the order queued. Once the queue is empty the last
/// reply is repeated if [`MockTransport::repeat_last`] was set; otherwise the
/// transport fails with a connection error.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    last: Mutex<Option<MockReply>>,
    repeat_last: bool,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MockTransport {
    /// Creates a mock transport with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, reply: MockReply) -> Self {
        lock(&self.replies).push_back(reply);
        self
    }

    /// Queues a JSON response.
    pub fn with_json(self, status: u16, body: serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.with_response(Response::new(status, headers, ResponseBody::Json(body)))
    }

    /// Queues a response.
    pub fn with_response(self, response: Response) -> Self {
        self.push(MockReply::Response(response))
    }

    /// Queues a streamed response delivered in the given chunks.
    pub fn with_chunks<I, B>(self, status: u16, content_type: &'static str, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.push(MockReply::Chunks {
            status,
            headers,
            chunks: chunks.into_iter().map(|c| Ok(c.into())).collect(),
        })
    }

    /// Queues a streamed response whose connection breaks after `chunks`.
    pub fn with_broken_stream<I, B>(self, content_type: &'static str, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        let mut chunks: Vec<_> = chunks.into_iter().map(|c| Ok(c.into())).collect();
        chunks.push(Err(TransportError::Connection {
            message: "connection reset".to_string(),
        }));
        self.push(MockReply::Chunks {
            status: 200,
            headers,
            chunks,
        })
    }

    /// Queues a transport failure.
    pub fn with_failure(self, error: TransportError) -> Self {
        self.push(MockReply::Failure(error))
    }

    /// Repeats the last reply once the queue is exhausted.
    pub fn repeat_last(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    /// Shared handle to the requests received so far.
    ///
    /// Stays valid after the transport has been moved into a pipeline.
    pub fn requests_handle(&self) -> Arc<Mutex<Vec<Request>>> {
        Arc::clone(&self.requests)
    }

    /// Number of requests received.
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    fn next_reply(&self, request: &Request) -> MockReply {
        lock(&self.requests).push(request.clone());

        let queued = lock(&self.replies).pop_front();
        match queued {
            Some(reply) => {
                *lock(&self.last) = Some(reply.clone());
                reply
            }
            None => match lock(&self.last).clone() {
                Some(reply) if self.repeat_last => reply,
                _ => MockReply::Failure(TransportError::Connection {
                    message: format!("no mock reply queued for {}", request),
                }),
            },
        }
    }
}

fn body_bytes(body: &ResponseBody) -> Bytes {
    match body {
        ResponseBody::Empty => Bytes::new(),
        ResponseBody::Json(value) => Bytes::from(value.to_string()),
        ResponseBody::Text(text) => Bytes::from(text.clone()),
        ResponseBody::Bytes(bytes) => bytes.clone(),
    }
}

impl HttpTransport for MockTransport {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        match self.next_reply(request) {
            MockReply::Response(response) => Ok(response),
            MockReply::Chunks {
                status,
                headers,
                chunks,
            } => {
                let streaming = StreamingResponse {
                    framing: ChunkFraming::from_headers(&headers),
                    status,
                    headers,
                    chunks: Box::new(chunks.into_iter()),
                };
                streaming.into_response()
            }
            MockReply::Failure(error) => Err(error),
        }
    }

    fn send_streaming(&self, request: &Request) -> Result<StreamingResponse, TransportError> {
        let (status, headers, chunks) = match self.next_reply(request) {
            MockReply::Response(response) => {
                let body = body_bytes(&response.body);
                let chunks = if body.is_empty() { Vec::new() } else { vec![Ok(body)] };
                (response.status, response.headers, chunks)
            }
            MockReply::Chunks {
                status,
                headers,
                chunks,
            } => (status, headers, chunks),
            MockReply::Failure(error) => return Err(error),
        };

        Ok(StreamingResponse {
            framing: ChunkFraming::from_headers(&headers),
            status,
            headers,
            chunks: Box::new(chunks.into_iter()),
        })
    }
}

/// A hook that records every callback it receives.
///
/// Hooks created with [`RecordingHook::named`] share one log, so the order
/// of calls across several hooks can be asserted.
#[derive(Debug, Clone)]
pub struct RecordingHook {
    name: String,
    calls: Arc<Mutex<Vec<String>>>,
    errors: Arc<Mutex<Vec<Option<u16>>>>,
    exhausted: Arc<Mutex<Vec<bool>>>,
}

impl Default for RecordingHook {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingHook {
    /// Creates a recording hook named `hook`.
    pub fn new() -> Self {
        Self {
            name: "hook".to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            errors: Arc::new(Mutex::new(Vec::new())),
            exhausted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates another hook writing to the same log under `name`.
    pub fn named(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    /// Callbacks received so far, as `name.callback`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Status codes of the errors seen by `on_error`.
    pub fn error_statuses(&self) -> Vec<Option<u16>> {
        lock(&self.errors).clone()
    }

    /// For each `on_error`, whether the error was a spent retry budget.
    pub fn exhausted_flags(&self) -> Vec<bool> {
        lock(&self.exhausted).clone()
    }

    fn record(&self, callback: &str) {
        lock(&self.calls).push(format!("{}.{}", self.name, callback));
    }
}

impl Hook for RecordingHook {
    fn before_request(&self, _request: &mut Request) -> SdkResult<()> {
        self.record("before_request");
        Ok(())
    }

    fn after_response(&self, _request: &Request, _response: &Response) -> SdkResult<()> {
        self.record("after_response");
        Ok(())
    }

    fn on_error(
        &self,
        error: &SdkError,
        _request: &Request,
        response: Option<&Response>,
    ) -> SdkResult<()> {
        self.record("on_error");
        lock(&self.errors).push(response.map(|r| r.status));
        lock(&self.exhausted).push(error.is_retry_exhausted());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replies_in_order_then_fails() {
        let transport = MockTransport::new()
            .with_json(200, serde_json::json!({"n": 1}))
            .with_json(201, serde_json::json!({"n": 2}));
        let request = Request::get("http://localhost/users");

        assert_eq!(transport.send(&request).unwrap().status, 200);
        assert_eq!(transport.send(&request).unwrap().status, 201);
        assert!(transport.send(&request).is_err());
        assert_eq!(transport.request_count(), 3);
    }

    #[test]
    fn test_repeat_last() {
        let transport = MockTransport::new()
            .with_json(503, serde_json::json!({}))
            .repeat_last();
        let request = Request::get("http://localhost/users");

        for _ in 0..4 {
            assert_eq!(transport.send(&request).unwrap().status, 503);
        }
    }

    #[test]
    fn test_chunks_collapse_for_plain_send() {
        let transport =
            MockTransport::new().with_chunks(200, "application/json", ["{\"id\":", "\"user-1\"}"]);

        let response = transport.send(&Request::get("http://localhost/users/user-1")).unwrap();

        assert_eq!(response.body.as_json().unwrap()["id"], "user-1");
    }

    #[test]
    fn test_named_hooks_share_log() {
        let recorder = RecordingHook::new();
        let a = recorder.named("a");
        let b = recorder.named("b");
        let mut request = Request::get("http://localhost/users");

        a.before_request(&mut request).unwrap();
        b.before_request(&mut request).unwrap();

        assert_eq!(recorder.calls(), vec!["a.before_request", "b.before_request"]);
    }
}
