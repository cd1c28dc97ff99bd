//! Observability for the User Permissions API client.
//!
//! The pipeline reports through `tracing`: the transport logs each exchange
//! at `debug`, the retry handler logs every retry decision at `info` and a
//! spent budget at `warn`. [`TracingHook`](crate::hooks::TracingHook) adds
//! one event per call. Installing a subscriber is left to the application;
//! [`LoggingConfig`] covers the common setups.

mod logging;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
