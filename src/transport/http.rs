//! HTTP transport implementation.

use ::http::header::CONTENT_TYPE;
use bytes::Bytes;
use reqwest::blocking::{Client, ClientBuilder};
use std::io::Read;
use std::time::Duration;
use tracing::instrument;

use super::{
    ChunkFraming, HttpMethod, Request, Response, ResponseBody, StreamingResponse, TransportError,
};

/// Size of the buffer used when reading a streamed body.
const STREAM_CHUNK_SIZE: usize = 8 * 1024;

/// HTTP transport trait.
///
/// Implementations perform exactly one network exchange per call and never
/// retry on their own. They must be safe to share between threads; any
/// connection reuse is internal to the implementation.
pub trait HttpTransport: Send + Sync {
    /// Sends a request and reads the whole response.
    ///
    /// Non-success statuses are returned as responses, not errors.
    fn send(&self, request: &Request) -> Result<Response, TransportError>;

    /// Sends a request and returns the response head plus a lazy body.
    fn send_streaming(&self, request: &Request) -> Result<StreamingResponse, TransportError>;
}

/// HTTP transport implementation using a pooled blocking reqwest client.
pub struct ReqwestTransport {
    client: Client,
    default_timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a new HTTP transport.
    ///
    /// `default_timeout` applies to requests that do not carry their own.
    pub fn new(default_timeout: Duration) -> Result<Self, TransportError> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| TransportError::Connection {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            default_timeout,
        })
    }

    fn execute(&self, request: &Request) -> Result<reqwest::blocking::Response, TransportError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut req_builder = self
            .client
            .request(method, &request.url)
            .headers(request.headers.clone())
            .timeout(timeout);

        let body = request
            .body
            .to_bytes()
            .map_err(|e| TransportError::InvalidRequest {
                message: e.to_string(),
            })?;
        if let Some(body) = body {
            req_builder = req_builder.body(body);
        }

        req_builder.send().map_err(|e| classify(&e, timeout))
    }
}

fn classify(error: &reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout { timeout }
    } else if error.is_connect() {
        TransportError::Connection {
            message: error.to_string(),
        }
    } else {
        TransportError::InvalidResponse {
            message: error.to_string(),
        }
    }
}

impl HttpTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let response = self.execute(request)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().map_err(|e| classify(&e, timeout))?;

        tracing::debug!(status, body_len = body.len(), "Response received");

        Ok(Response {
            status,
            headers,
            body: ResponseBody::from_bytes(content_type.as_deref(), body),
        })
    }

    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    fn send_streaming(&self, request: &Request) -> Result<StreamingResponse, TransportError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let mut response = self.execute(request)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let framing = ChunkFraming::from_headers(&headers);

        tracing::debug!(status, ?framing, "Stream opened");

        let chunks = std::iter::from_fn(move || {
            let mut buffer = vec![0u8; STREAM_CHUNK_SIZE];
            match response.read(&mut buffer) {
                Ok(0) => None,
                Ok(read) => {
                    buffer.truncate(read);
                    Some(Ok(Bytes::from(buffer)))
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    Some(Err(TransportError::Timeout { timeout }))
                }
                Err(e) => Some(Err(TransportError::InvalidResponse {
                    message: e.to_string(),
                })),
            }
        });

        Ok(StreamingResponse {
            status,
            headers,
            framing,
            chunks: Box::new(chunks),
        })
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}
