//! Terminal handler performing the network exchange.

use std::sync::Arc;

use super::{Handler, Next};
use crate::errors::{SdkError, SdkResult};
use crate::transport::{HttpTransport, Request, Response, ResponseStream};

/// Sends the request over an [`HttpTransport`].
///
/// Terminal: `next` is never invoked. Transport failures become
/// [`SdkError::Network`] and statuses of 400 and above become
/// [`SdkError::Http`], so the retry handler can classify them.
pub struct TransportHandler {
    transport: Arc<dyn HttpTransport>,
}

impl TransportHandler {
    /// Creates a terminal handler over a transport.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl Handler for TransportHandler {
    fn handle(&self, request: Request, _next: Next<'_>) -> SdkResult<Response> {
        let response = self.transport.send(&request)?;

        if response.is_error() {
            return Err(SdkError::http(response));
        }
        Ok(response)
    }

    fn stream(&self, request: Request, _next: Next<'_>) -> SdkResult<ResponseStream> {
        let streaming = self.transport.send_streaming(&request)?;

        if streaming.status >= 400 {
            // Read the error body so the caller gets a complete Response.
            let response = streaming.into_response()?;
            return Err(SdkError::http(response));
        }
        Ok(ResponseStream::new(streaming))
    }
}

impl std::fmt::Debug for TransportHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportHandler").finish_non_exhaustive()
    }
}
