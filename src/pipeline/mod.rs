//! Request execution pipeline.
//!
//! A call travels through an ordered chain of [`Handler`]s. Each handler
//! receives the request together with a [`Next`] handle to the rest of the
//! chain and decides whether, and how often, to delegate. The last handler
//! is terminal and performs the network exchange.
//!
//! The standard chain is hook handling, then retry, then transport:
//!
//! ```text
//! HookHandler -> RetryHandler -> TransportHandler
//! ```
//!
//! Hooks sit outermost so they observe one outcome per call, after retries
//! have run their course.

mod hook;
mod retry;
mod transport;

pub use hook::HookHandler;
pub use retry::RetryHandler;
pub use transport::TransportHandler;

use std::sync::Arc;

use crate::errors::{SdkError, SdkResult};
use crate::hooks::Hook;
use crate::transport::{HttpTransport, Request, Response, ResponseStream};

/// One stage of the request pipeline.
pub trait Handler: Send + Sync {
    /// Processes a request that expects a single response.
    fn handle(&self, request: Request, next: Next<'_>) -> SdkResult<Response>;

    /// Processes a request that expects a lazy sequence of chunks.
    ///
    /// Defaults to passing the request straight through.
    fn stream(&self, request: Request, next: Next<'_>) -> SdkResult<ResponseStream> {
        next.stream(request)
    }
}

/// The remainder of a chain, as seen from inside a handler.
///
/// `Next` is `Copy`, so a handler may invoke it more than once (the retry
/// handler does).
#[derive(Clone, Copy)]
pub struct Next<'a> {
    handlers: &'a [Arc<dyn Handler>],
}

impl<'a> Next<'a> {
    fn split(self) -> SdkResult<(&'a Arc<dyn Handler>, Next<'a>)> {
        match self.handlers.split_first() {
            Some((handler, rest)) => Ok((handler, Next { handlers: rest })),
            None => Err(SdkError::Execution {
                message: "request chain has no terminal handler".to_string(),
            }),
        }
    }

    /// Runs the remaining handlers for a single response.
    pub fn run(self, request: Request) -> SdkResult<Response> {
        let (handler, rest) = self.split()?;
        handler.handle(request, rest)
    }

    /// Runs the remaining handlers for a streamed response.
    pub fn stream(self, request: Request) -> SdkResult<ResponseStream> {
        let (handler, rest) = self.split()?;
        handler.stream(request, rest)
    }

    /// Number of handlers left in the chain.
    pub fn remaining(&self) -> usize {
        self.handlers.len()
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.remaining())
            .finish()
    }
}

/// An ordered chain of handlers.
#[derive(Clone, Default)]
pub struct RequestChain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl RequestChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the standard hook, retry, transport chain.
    pub fn standard(hooks: Vec<Arc<dyn Hook>>, transport: Arc<dyn HttpTransport>) -> Self {
        Self::new()
            .add_handler(HookHandler::new(hooks))
            .add_handler(RetryHandler::new())
            .add_handler(TransportHandler::new(transport))
    }

    /// Appends a handler. The last handler added must be terminal.
    pub fn add_handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Number of handlers in the chain.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handler has been added.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Sends a request and waits for its single response.
    pub fn send(&self, request: Request) -> SdkResult<Response> {
        self.start().run(request)
    }

    /// Sends a request and returns its body as a lazy chunk sequence.
    pub fn stream(&self, request: Request) -> SdkResult<ResponseStream> {
        self.start().stream(request)
    }

    fn start(&self) -> Next<'_> {
        Next {
            handlers: &self.handlers,
        }
    }
}

impl std::fmt::Debug for RequestChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestChain")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
