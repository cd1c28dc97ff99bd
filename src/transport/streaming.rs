//! Streaming response handling and SSE framing.
//!
//! A [`ResponseStream`] is a forward-only, finite sequence of response
//! chunks read from a single connection. It holds that connection open until
//! it is exhausted or dropped and cannot be restarted; issuing the call again
//! is the only way to read the body a second time.

use ::http::header::{HeaderMap, CONTENT_TYPE};
use bytes::Bytes;

use super::{Response, ResponseBody, TransportError};
use crate::errors::SdkError;

/// Lazy body chunks as produced by a transport.
pub type ChunkIter = Box<dyn Iterator<Item = Result<Bytes, TransportError>> + Send>;

/// Streaming HTTP response as returned by a transport.
pub struct StreamingResponse {
    /// HTTP status code captured when the connection opened.
    pub status: u16,
    /// Response headers captured when the connection opened.
    pub headers: HeaderMap,
    /// How the body is split into chunks.
    pub framing: ChunkFraming,
    /// Raw body chunks.
    pub chunks: ChunkIter,
}

impl StreamingResponse {
    /// Returns the status and headers as a body-less response.
    pub fn head(&self) -> Response {
        Response::new(self.status, self.headers.clone(), ResponseBody::Empty)
    }

    /// Drains the body into a single response, used for error statuses.
    pub fn into_response(self) -> Result<Response, TransportError> {
        let mut body = Vec::new();
        for chunk in self.chunks {
            body.extend_from_slice(&chunk?);
        }
        let content_type = self
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok(Response::new(
            self.status,
            self.headers,
            ResponseBody::from_bytes(content_type.as_deref(), Bytes::from(body)),
        ))
    }
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("framing", &self.framing)
            .finish()
    }
}

/// How a streamed body is split into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFraming {
    /// Chunks are whatever the connection delivers.
    Raw,
    /// `text/event-stream`: one chunk per event.
    EventStream,
}

impl ChunkFraming {
    /// Picks the framing from the response content type.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let is_sse = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("text/event-stream"));
        if is_sse {
            ChunkFraming::EventStream
        } else {
            ChunkFraming::Raw
        }
    }
}

/// Server-Sent Event.
#[derive(Debug, Clone)]
pub struct SseEvent {
    /// Event type.
    pub event: Option<String>,
    /// Event data.
    pub data: String,
    /// Event ID.
    pub id: Option<String>,
    /// Retry timeout in milliseconds.
    pub retry: Option<u64>,
}

#[derive(Debug, Default)]
struct SseEventBuilder {
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
    retry: Option<u64>,
}

impl SseEventBuilder {
    fn build(self) -> Option<SseEvent> {
        if self.data.is_empty() {
            return None;
        }

        Some(SseEvent {
            event: self.event,
            data: self.data.join("\n"),
            id: self.id,
            retry: self.retry,
        })
    }
}

/// SSE parser that turns text chunks into events.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    current_event: SseEventBuilder,
}

impl SseParser {
    /// Creates a new SSE parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a chunk of data and returns any complete events.
    pub fn parse(&mut self, chunk: &str) -> Vec<SseEvent> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();

        while let Some(newline_pos) = self.buffer.find('\n') {
            let line = self.buffer[..newline_pos].trim_end_matches('\r').to_string();
            self.buffer.drain(..=newline_pos);

            if let Some(event) = self.parse_line(&line) {
                events.push(event);
            }
        }

        events
    }

    fn parse_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return std::mem::take(&mut self.current_event).build();
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.current_event.event = Some(value.to_string()),
            "data" => self.current_event.data.push(value.to_string()),
            "id" => self.current_event.id = Some(value.to_string()),
            "retry" => self.current_event.retry = value.parse().ok(),
            _ => {}
        }

        None
    }

    /// Flushes any event left without a terminating blank line.
    pub fn flush(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            let _ = self.parse_line(line.trim_end_matches('\r'));
        }
        std::mem::take(&mut self.current_event).build()
    }
}

/// Lazy sequence of response chunks sharing one status and header set.
///
/// Each item is a [`Response`] whose status and headers are those captured
/// when the connection opened and whose body is one chunk. For event streams
/// every event's data is one chunk, decoded as JSON when it parses. The
/// sequence ends at the end of the body; after an error it yields nothing
/// more.
pub struct ResponseStream {
    status: u16,
    headers: HeaderMap,
    framing: ChunkFraming,
    chunks: ChunkIter,
    parser: SseParser,
    pending: std::collections::VecDeque<SseEvent>,
    carry: Vec<u8>,
    done: bool,
}

impl ResponseStream {
    /// Wraps a transport stream.
    pub fn new(response: StreamingResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            framing: response.framing,
            chunks: response.chunks,
            parser: SseParser::new(),
            pending: std::collections::VecDeque::new(),
            carry: Vec::new(),
            done: false,
        }
    }

    /// HTTP status captured when the connection opened.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Headers captured when the connection opened.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the status and headers as a body-less response.
    pub fn head(&self) -> Response {
        Response::new(self.status, self.headers.clone(), ResponseBody::Empty)
    }

    fn chunk(&self, body: ResponseBody) -> Response {
        Response::new(self.status, self.headers.clone(), body)
    }

    fn event_chunk(&self, event: SseEvent) -> Response {
        let body = match serde_json::from_str(&event.data) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(event.data),
        };
        self.chunk(body)
    }

    fn next_event(&mut self) -> Option<Result<Response, SdkError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(self.event_chunk(event)));
            }
            if self.done {
                return None;
            }

            match self.chunks.next() {
                Some(Ok(bytes)) => {
                    self.carry.extend_from_slice(&bytes);
                    let valid = match std::str::from_utf8(&self.carry) {
                        Ok(text) => text.len(),
                        // A multi-byte character split across chunks.
                        Err(e) if e.error_len().is_none() => e.valid_up_to(),
                        Err(e) => {
                            self.done = true;
                            return Some(Err(SdkError::Serialization {
                                message: format!("Invalid UTF-8 in event stream: {}", e),
                            }));
                        }
                    };
                    let rest = self.carry.split_off(valid);
                    let text = String::from_utf8_lossy(&self.carry).into_owned();
                    self.carry = rest;
                    let events = self.parser.parse(&text);
                    self.pending.extend(events);
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.done = true;
                    if let Some(event) = self.parser.flush() {
                        self.pending.push_back(event);
                    }
                }
            }
        }
    }
}

impl Iterator for ResponseStream {
    type Item = Result<Response, SdkError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.framing {
            ChunkFraming::EventStream => self.next_event(),
            ChunkFraming::Raw => {
                if self.done {
                    return None;
                }
                match self.chunks.next() {
                    Some(Ok(bytes)) => Some(Ok(self.chunk(ResponseBody::Bytes(bytes)))),
                    Some(Err(e)) => {
                        self.done = true;
                        Some(Err(e.into()))
                    }
                    None => {
                        self.done = true;
                        None
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("status", &self.status)
            .field("framing", &self.framing)
            .field("done", &self.done)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::http::HeaderValue;
    use std::time::Duration;

    fn streaming(
        content_type: &str,
        chunks: Vec<Result<Bytes, TransportError>>,
    ) -> StreamingResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        StreamingResponse {
            status: 200,
            framing: ChunkFraming::from_headers(&headers),
            headers,
            chunks: Box::new(chunks.into_iter()),
        }
    }

    #[test]
    fn test_sse_parser_single_event() {
        let mut parser = SseParser::new();

        let events = parser.parse("data: test\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "test");
    }

    #[test]
    fn test_sse_parser_multiline_data_and_comment() {
        let mut parser = SseParser::new();

        let events = parser.parse(": keepalive\nevent: update\ndata: line1\ndata: line2\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("update"));
        assert_eq!(events[0].data, "line1\nline2");
    }

    #[test]
    fn test_sse_parser_incomplete() {
        let mut parser = SseParser::new();

        assert!(parser.parse("data: hel").is_empty());
        let events = parser.parse("lo\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_raw_stream_yields_chunks_with_captured_head() {
        let stream = ResponseStream::new(streaming(
            "application/octet-stream",
            vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))],
        ));

        let chunks: Vec<Response> = stream.map(Result::unwrap).collect();

        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.status == 200));
        assert_eq!(chunks[1].body, ResponseBody::Bytes(Bytes::from_static(b"cd")));
    }

    #[test]
    fn test_event_stream_decodes_json_events_across_chunks() {
        let stream = ResponseStream::new(streaming(
            "text/event-stream",
            vec![
                Ok(Bytes::from_static(b"data: {\"n\":1}\n\ndata: {\"n\"")),
                Ok(Bytes::from_static(b":2}\n\ndata: tail")),
            ],
        ));

        let bodies: Vec<ResponseBody> = stream.map(|c| c.unwrap().body).collect();

        assert_eq!(
            bodies,
            vec![
                ResponseBody::Json(serde_json::json!({"n": 1})),
                ResponseBody::Json(serde_json::json!({"n": 2})),
                ResponseBody::Text("tail".to_string()),
            ]
        );
    }

    #[test]
    fn test_event_stream_character_split_across_chunks() {
        let text = "data: café\n\n".as_bytes();
        let split = text.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let stream = ResponseStream::new(streaming(
            "text/event-stream",
            vec![
                Ok(Bytes::copy_from_slice(&text[..split])),
                Ok(Bytes::copy_from_slice(&text[split..])),
            ],
        ));

        let bodies: Vec<ResponseBody> = stream.map(|c| c.unwrap().body).collect();

        assert_eq!(bodies, vec![ResponseBody::Text("café".to_string())]);
    }

    #[test]
    fn test_stream_stops_after_error() {
        let mut stream = ResponseStream::new(streaming(
            "application/octet-stream",
            vec![
                Ok(Bytes::from_static(b"a")),
                Err(TransportError::Timeout {
                    timeout: Duration::from_millis(5),
                }),
                Ok(Bytes::from_static(b"never")),
            ],
        ));

        assert!(stream.next().unwrap().is_ok());
        let err = stream.next().unwrap().unwrap_err();
        assert!(err.is_timeout());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_into_response_drains_body() {
        let response = streaming(
            "application/json",
            vec![Ok(Bytes::from_static(b"{\"code\":")), Ok(Bytes::from_static(b"\"X\"}"))],
        )
        .into_response()
        .unwrap();

        assert_eq!(response.body, ResponseBody::Json(serde_json::json!({"code": "X"})));
    }
}
