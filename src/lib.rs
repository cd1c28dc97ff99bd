//! User Permissions API Client Library
//!
//! A Rust client for the User Permissions API: list users and permissions,
//! read, replace and grant a user's permissions, create and delete users.
//!
//! Every call travels through a fixed request pipeline:
//!
//! ```text
//! HookHandler -> RetryHandler -> TransportHandler
//! ```
//!
//! Hooks observe each call once, the retry handler re-sends on network
//! failures, 5xx and 429, and the transport handler performs the HTTP
//! exchange. Configuration is resolved per call from four levels (SDK,
//! service, method, request), the highest level that sets a field winning.
//!
//! # Features
//!
//! - **Typed services**: `UsersService` and `PermissionsService` with typed models
//! - **Layered configuration**: base URL or environment, timeout, retry, validation
//! - **Hooks**: observe requests, responses and errors in registration order
//! - **Retry**: fixed delay, `Retry-After` aware, exhaustion reported distinctly
//! - **Streaming**: lazy chunk sequences with `text/event-stream` framing
//! - **Async**: every operation also available as an `async fn`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use user_permissions_api::{SdkConfig, UpdateUserPermissionsRequest, UserPermissionsApi};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = UserPermissionsApi::builder()
//!         .base_url("http://localhost:3000/v1")
//!         .retry(3, 250)
//!         .build()?;
//!
//!     let users = client.users().list_users(None)?;
//!     println!("{} users", users.data.total);
//!
//!     let update = UpdateUserPermissionsRequest::new(["perm-read-users", "perm-write-users"]);
//!     let updated = client.users().update_user_permissions(
//!         &update,
//!         "user-1",
//!         Some(&SdkConfig::new().timeout_ms(5_000)),
//!     )?;
//!     println!("{:?}", updated.data.permissions);
//!     Ok(())
//! }
//! ```
//!
//! # Async Example
//!
//! ```rust,no_run
//! use user_permissions_api::UserPermissionsApi;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = tokio::task::spawn_blocking(|| UserPermissionsApi::builder().build())
//!         .await??
//!         .to_async();
//!
//!     let permissions = client.permissions().list_permissions(None).await?;
//!     println!("{} permissions", permissions.data.total);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod executor;
pub mod hooks;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod services;
pub mod transport;

// Re-exports for convenience
pub use client::{UserPermissionsApi, UserPermissionsApiAsync, UserPermissionsApiBuilder};
pub use config::{
    ConfigResolver, EffectiveConfig, Environment, RetryConfig, SdkConfig, ValidationConfig,
};
pub use errors::{ApiErrorBody, NetworkErrorKind, SdkError, SdkResult};
pub use executor::{ApiResponse, ResponseMetadata};
pub use hooks::{Hook, NoopHook, TracingHook};
pub use transport::{HttpMethod, Request, Response, ResponseBody, ResponseStream};

// Model re-exports
pub use models::{
    CreateUserRequest, GrantUserPermissionRequest, Permission, PermissionsList,
    UpdateUserPermissionsRequest, User, UserList, UserPermissions, Validate,
};

/// Mock implementations for testing.
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
