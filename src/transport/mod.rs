//! HTTP transport layer for the User Permissions API client.
//!
//! Defines the request/response values that flow through the pipeline and
//! the [`HttpTransport`] abstraction that performs the actual network call.

mod http;
mod streaming;

pub use self::http::{HttpTransport, ReqwestTransport};
pub use streaming::{
    ChunkFraming, ChunkIter, ResponseStream, SseEvent, SseParser, StreamingResponse,
};

use ::http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use bytes::Bytes;
use std::fmt;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::errors::{SdkError, SdkResult};

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET request.
    Get,
    /// POST request.
    Post,
    /// PUT request.
    Put,
    /// PATCH request.
    Patch,
    /// DELETE request.
    Delete,
}

impl HttpMethod {
    /// Returns the method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Returns true for methods that carry a JSON body.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    /// No body (GET/DELETE).
    #[default]
    Empty,
    /// JSON document, encoded when the request is sent.
    Json(serde_json::Value),
    /// Raw bytes sent as-is.
    Bytes(Bytes),
}

impl RequestBody {
    /// Returns true if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// Encodes the body for the wire.
    pub fn to_bytes(&self) -> SdkResult<Option<Vec<u8>>> {
        match self {
            RequestBody::Empty => Ok(None),
            RequestBody::Json(value) => Ok(Some(serde_json::to_vec(value)?)),
            RequestBody::Bytes(bytes) => Ok(Some(bytes.to_vec())),
        }
    }
}

/// An outbound request.
///
/// Built once per call by a service method. Handlers ahead of the terminal
/// transport handler may adjust it (hooks injecting headers, for instance);
/// the retry handler re-sends the same value on every attempt.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Request headers. Keys are case-insensitive; inserting replaces.
    pub headers: HeaderMap,
    /// Request body.
    pub body: RequestBody,
    /// Per-attempt timeout resolved for this call.
    pub timeout: Option<Duration>,
    /// Retry policy resolved for this call.
    pub retry: RetryConfig,
}

impl Request {
    /// Creates a request with no headers, no body and no retry.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            timeout: None,
            retry: RetryConfig::default(),
        }
    }

    /// Creates a new GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Creates a new POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Creates a new DELETE request.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    /// Sets a JSON body.
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets a header, replacing any previous value under the same name.
    pub fn with_header(mut self, name: &str, value: &str) -> SdkResult<Self> {
        self.set_header(name, value)?;
        Ok(self)
    }

    /// Sets a header in place, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: &str) -> SdkResult<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| SdkError::validation_field(e.to_string(), "headers"))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| SdkError::validation_field(e.to_string(), "headers"))?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Parsed response payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseBody {
    /// Nothing was returned (e.g. 204).
    #[default]
    Empty,
    /// A JSON document.
    Json(serde_json::Value),
    /// A textual payload that is not JSON.
    Text(String),
    /// Anything else.
    Bytes(Bytes),
}

impl ResponseBody {
    /// Parses raw bytes according to the response content type.
    ///
    /// JSON media types (including `+json` suffixes) are decoded; a JSON
    /// content type with a body that does not parse falls back to text.
    pub fn from_bytes(content_type: Option<&str>, bytes: Bytes) -> Self {
        if bytes.is_empty() {
            return ResponseBody::Empty;
        }

        let mime = content_type.and_then(|ct| ct.parse::<mime::Mime>().ok());
        let is_json = mime.as_ref().is_some_and(|m| {
            m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON)
        });
        let is_text = mime.as_ref().is_some_and(|m| m.type_() == mime::TEXT);

        if is_json {
            if let Ok(value) = serde_json::from_slice(&bytes) {
                return ResponseBody::Json(value);
            }
        }

        if is_json || is_text {
            return match String::from_utf8(bytes.to_vec()) {
                Ok(text) => ResponseBody::Text(text),
                Err(_) => ResponseBody::Bytes(bytes),
            };
        }

        ResponseBody::Bytes(bytes)
    }

    /// Returns the JSON document, if this body is one.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true if the body is empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseBody::Empty)
    }

    /// Converts the body into a JSON value for typed decoding.
    ///
    /// An empty body becomes `null`, text becomes a JSON string.
    pub fn to_value(&self) -> SdkResult<serde_json::Value> {
        match self {
            ResponseBody::Empty => Ok(serde_json::Value::Null),
            ResponseBody::Json(value) => Ok(value.clone()),
            ResponseBody::Text(text) => Ok(serde_json::Value::String(text.clone())),
            ResponseBody::Bytes(bytes) => serde_json::from_slice(bytes).map_err(SdkError::from),
        }
    }
}

impl fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Empty => f.write_str("<empty>"),
            ResponseBody::Json(value) => write!(f, "{}", value),
            ResponseBody::Text(text) => f.write_str(text),
            ResponseBody::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// A response received for one attempt.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers; a name may carry several values.
    pub headers: HeaderMap,
    /// Parsed body.
    pub body: ResponseBody,
}

impl Response {
    /// Creates a response.
    pub fn new(status: u16, headers: HeaderMap, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns true if the status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if the status is a client or server error.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Returns the lower-cased content type, or an empty string.
    pub fn content_type(&self) -> String {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase()
    }

    /// Returns the first value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns every value of a header, in the order received.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Returns the wait requested by a `Retry-After` header.
    pub fn retry_after(&self) -> Option<Duration> {
        self.header(RETRY_AFTER.as_str()).and_then(parse_retry_after)
    }

    /// Decodes the body into `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> SdkResult<T> {
        let value = self.body.to_value()?;
        serde_json::from_value(value).map_err(SdkError::from)
    }
}

/// Parses a `Retry-After` value: delay-seconds or an HTTP-date.
///
/// Dates in the past yield a zero wait.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let date = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let wait = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}

/// Transport error types.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Connection error.
    #[error("Connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// Timeout error.
    #[error("Timeout after {timeout:?}")]
    Timeout {
        /// Timeout duration.
        timeout: Duration,
    },

    /// The request could not be encoded.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message.
        message: String,
    },

    /// Invalid response.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },
}

impl From<TransportError> for SdkError {
    fn from(err: TransportError) -> Self {
        use crate::errors::NetworkErrorKind;

        match err {
            TransportError::Timeout { .. } => {
                SdkError::network(NetworkErrorKind::Timeout, err.to_string())
            }
            TransportError::Connection { .. } => {
                SdkError::network(NetworkErrorKind::Connect, err.to_string())
            }
            TransportError::InvalidRequest { message } => SdkError::Serialization { message },
            TransportError::InvalidResponse { .. } => {
                SdkError::network(NetworkErrorKind::Other, err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_headers_are_case_insensitive_last_wins() {
        let request = Request::get("http://localhost:3000/v1/users")
            .with_header("X-Trace", "one")
            .unwrap()
            .with_header("x-trace", "two")
            .unwrap();

        assert_eq!(request.header("X-TRACE"), Some("two"));
        assert_eq!(request.headers.len(), 1);
    }

    #[test]
    fn test_invalid_header_name_is_validation_error() {
        let result = Request::get("http://localhost").with_header("bad header", "x");
        assert!(matches!(result, Err(SdkError::Validation { .. })));
    }

    #[test]
    fn test_body_parsing_follows_content_type() {
        let json = ResponseBody::from_bytes(
            Some("application/json; charset=utf-8"),
            Bytes::from_static(br#"{"ok":true}"#),
        );
        assert_eq!(json, ResponseBody::Json(serde_json::json!({"ok": true})));

        let problem = ResponseBody::from_bytes(
            Some("application/problem+json"),
            Bytes::from_static(br#"{"code":"X"}"#),
        );
        assert!(problem.as_json().is_some());

        let text = ResponseBody::from_bytes(Some("text/plain"), Bytes::from_static(b"hello"));
        assert_eq!(text, ResponseBody::Text("hello".to_string()));

        let raw = ResponseBody::from_bytes(
            Some("application/octet-stream"),
            Bytes::from_static(&[0, 1, 2]),
        );
        assert!(matches!(raw, ResponseBody::Bytes(_)));

        let empty = ResponseBody::from_bytes(Some("application/json"), Bytes::new());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_malformed_json_falls_back_to_text() {
        let body = ResponseBody::from_bytes(Some("application/json"), Bytes::from_static(b"oops"));
        assert_eq!(body, ResponseBody::Text("oops".to_string()));
    }

    #[test]
    fn test_multi_valued_response_headers() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        let response = Response::new(200, headers, ResponseBody::Empty);

        assert_eq!(response.header_values("Set-Cookie"), vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("3"), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn test_parse_retry_after_past_date_is_zero() {
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_empty_body_decodes_to_unit() {
        let response = Response::new(204, HeaderMap::new(), ResponseBody::Empty);
        let decoded: Result<(), _> = response.json();
        assert!(decoded.is_ok());
    }
}
