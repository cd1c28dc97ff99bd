//! Service implementations for the User Permissions API.
//!
//! Each service owns its service-level and method-level configuration
//! records and delegates request execution to a shared
//! [`RequestExecutor`](crate::executor::RequestExecutor). The async variants
//! run the same blocking calls on Tokio's blocking thread pool.

mod permissions;
mod users;

pub use permissions::{PermissionsService, PermissionsServiceAsync};
pub use users::{UsersService, UsersServiceAsync};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{validate_base_url, SdkConfig};
use crate::errors::{SdkError, SdkResult};
use crate::executor::{ApiResponse, RequestExecutor};
use crate::models::Validate;
use crate::transport::{HttpMethod, ResponseStream};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// State shared by every service: the executor plus this service's
/// configuration records.
pub(crate) struct ServiceCore {
    executor: Arc<RequestExecutor>,
    config: RwLock<SdkConfig>,
    methods: RwLock<HashMap<&'static str, SdkConfig>>,
}

impl ServiceCore {
    pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
        Self {
            executor,
            config: RwLock::new(SdkConfig::default()),
            methods: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn config(&self) -> SdkConfig {
        read(&self.config).clone()
    }

    pub(crate) fn set_config(&self, config: SdkConfig) {
        *write(&self.config) = config;
    }

    pub(crate) fn set_base_url(&self, base_url: &str) -> SdkResult<()> {
        validate_base_url(base_url)?;
        let mut config = write(&self.config);
        config.base_url = Some(base_url.to_string());
        config.environment = None;
        Ok(())
    }

    pub(crate) fn set_timeout(&self, timeout_ms: u64) {
        write(&self.config).timeout = Some(timeout_ms);
    }

    pub(crate) fn method_config(&self, operation: &str) -> Option<SdkConfig> {
        read(&self.methods).get(operation).cloned()
    }

    pub(crate) fn set_method_config(&self, operation: &'static str, config: SdkConfig) {
        write(&self.methods).insert(operation, config);
    }

    /// Resolves, builds and sends one call.
    ///
    /// Configuration is resolved from snapshots taken here, so setters called
    /// while the request is in flight apply only to later calls.
    pub(crate) fn call<T, B>(
        &self,
        operation: &'static str,
        method: HttpMethod,
        segments: &[&str],
        body: Option<&B>,
        request_config: Option<&SdkConfig>,
    ) -> SdkResult<ApiResponse<T>>
    where
        T: DeserializeOwned + Validate + Default,
        B: Serialize,
    {
        let service = self.config();
        let method_config = self.method_config(operation);
        let effective =
            self.executor
                .resolve(Some(&service), method_config.as_ref(), request_config);

        tracing::debug!(
            operation,
            base_url = effective.url(),
            timeout_ms = effective.timeout().as_millis() as u64,
            attempts = effective.retry().attempts,
            "Resolved call configuration"
        );

        let request = self
            .executor
            .build_request(method, &effective, segments, body)?;
        self.executor
            .execute(request, effective.response_validation())
    }

    /// Like [`ServiceCore::call`] but returns the body as a stream.
    pub(crate) fn stream(
        &self,
        operation: &'static str,
        segments: &[&str],
        request_config: Option<&SdkConfig>,
    ) -> SdkResult<ResponseStream> {
        let service = self.config();
        let method_config = self.method_config(operation);
        let effective =
            self.executor
                .resolve(Some(&service), method_config.as_ref(), request_config);

        let request =
            self.executor
                .build_request::<()>(HttpMethod::Get, &effective, segments, None)?;
        self.executor.stream(request)
    }
}

impl std::fmt::Debug for ServiceCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCore")
            .field("config", &self.config())
            .field("methods", &read(&self.methods).keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Runs a blocking call on Tokio's blocking pool and awaits its result.
///
/// Only the execution context changes; the call itself is unchanged.
pub(crate) async fn run_blocking<T, F>(call: F) -> SdkResult<T>
where
    F: FnOnce() -> SdkResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| SdkError::Execution {
            message: format!("blocking call did not complete: {}", e),
        })?
}
