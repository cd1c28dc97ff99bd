//! User Permissions API client.
//!
//! Provides the main client interface and its async counterpart.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthProvider;
use crate::config::{validate_base_url, Environment, RetryConfig, SdkConfig, DEFAULT_TIMEOUT_MS};
use crate::errors::SdkResult;
use crate::executor::RequestExecutor;
use crate::hooks::Hook;
use crate::pipeline::RequestChain;
use crate::services::{PermissionsService, PermissionsServiceAsync, UsersService, UsersServiceAsync};
use crate::transport::{HttpTransport, ReqwestTransport};

/// The main User Permissions API client.
///
/// Holds the SDK-level configuration record and one instance of each
/// service. Every call is synchronous; see [`UserPermissionsApiAsync`] for
/// the async calling convention.
///
/// # Example
///
/// ```rust,no_run
/// use user_permissions_api::{Environment, UserPermissionsApi};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = UserPermissionsApi::builder()
///         .environment(Environment::Default)
///         .retry(3, 200)
///         .build()?;
///
///     let users = client.users().list_users(None)?;
///     for user in users.data.users {
///         println!("{}", user.id);
///     }
///     Ok(())
/// }
/// ```
pub struct UserPermissionsApi {
    executor: Arc<RequestExecutor>,
    users: Arc<UsersService>,
    permissions: Arc<PermissionsService>,
}

impl UserPermissionsApi {
    /// Creates a new client builder.
    pub fn builder() -> UserPermissionsApiBuilder {
        UserPermissionsApiBuilder::new()
    }

    /// Creates a client with an optional base URL and a timeout in milliseconds.
    pub fn new(base_url: Option<&str>, timeout_ms: u64) -> SdkResult<Self> {
        let mut builder = Self::builder().timeout(timeout_ms);
        if let Some(base_url) = base_url {
            builder = builder.base_url(base_url);
        }
        builder.build()
    }

    /// Creates a client from `USER_PERMISSIONS_API_*` environment variables.
    pub fn from_env() -> SdkResult<Self> {
        Self::builder().config(SdkConfig::from_env()?).build()
    }

    /// Returns the users service.
    pub fn users(&self) -> &UsersService {
        &self.users
    }

    /// Returns the permissions service.
    pub fn permissions(&self) -> &PermissionsService {
        &self.permissions
    }

    /// Returns the executor shared by the services.
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Returns a snapshot of the SDK-level configuration record.
    pub fn config(&self) -> SdkConfig {
        self.executor.sdk_config()
    }

    /// Replaces the SDK-level configuration record.
    pub fn set_config(&self, config: SdkConfig) -> SdkResult<&Self> {
        if let Some(base_url) = &config.base_url {
            validate_base_url(base_url)?;
        }
        self.executor.update_sdk_config(|current| *current = config);
        Ok(self)
    }

    /// Sets the SDK-level base URL.
    pub fn set_base_url(&self, base_url: &str) -> SdkResult<&Self> {
        validate_base_url(base_url)?;
        self.executor.update_sdk_config(|config| {
            config.base_url = Some(base_url.to_string());
            config.environment = None;
        });
        Ok(self)
    }

    /// Sets the SDK-level environment.
    pub fn set_environment(&self, environment: Environment) -> &Self {
        self.executor.update_sdk_config(|config| {
            config.environment = Some(environment);
            config.base_url = None;
        });
        self
    }

    /// Sets the SDK-level timeout in milliseconds.
    pub fn set_timeout(&self, timeout_ms: u64) -> &Self {
        self.executor
            .update_sdk_config(|config| config.timeout = Some(timeout_ms));
        self
    }

    /// Returns an async client sharing this client's services.
    pub fn to_async(&self) -> UserPermissionsApiAsync {
        UserPermissionsApiAsync {
            executor: Arc::clone(&self.executor),
            users: UsersServiceAsync::new(Arc::clone(&self.users)),
            permissions: PermissionsServiceAsync::new(Arc::clone(&self.permissions)),
        }
    }
}

impl std::fmt::Debug for UserPermissionsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPermissionsApi")
            .field("config", &self.config())
            .finish()
    }
}

/// Async User Permissions API client.
///
/// Each call runs the blocking pipeline on Tokio's blocking pool. Configuration
/// is shared with the [`UserPermissionsApi`] it was created from.
#[derive(Debug, Clone)]
pub struct UserPermissionsApiAsync {
    executor: Arc<RequestExecutor>,
    users: UsersServiceAsync,
    permissions: PermissionsServiceAsync,
}

impl UserPermissionsApiAsync {
    /// Wraps a blocking client.
    pub fn new(client: &UserPermissionsApi) -> Self {
        client.to_async()
    }

    /// Returns the async users service.
    pub fn users(&self) -> &UsersServiceAsync {
        &self.users
    }

    /// Returns the async permissions service.
    pub fn permissions(&self) -> &PermissionsServiceAsync {
        &self.permissions
    }

    /// Sets the SDK-level timeout in milliseconds.
    pub fn set_timeout(&self, timeout_ms: u64) -> &Self {
        self.executor
            .update_sdk_config(|config| config.timeout = Some(timeout_ms));
        self
    }
}

/// Builder for the User Permissions API client.
pub struct UserPermissionsApiBuilder {
    config: SdkConfig,
    hooks: Vec<Arc<dyn Hook>>,
    transport: Option<Arc<dyn HttpTransport>>,
    auth: Option<Arc<dyn AuthProvider>>,
}

impl UserPermissionsApiBuilder {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self {
            config: SdkConfig::default(),
            hooks: Vec::new(),
            transport: None,
            auth: None,
        }
    }

    /// Sets the SDK-level configuration record, replacing earlier settings.
    pub fn config(mut self, config: SdkConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self.config.environment = None;
        self
    }

    /// Sets the environment.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.config.environment = Some(environment);
        self.config.base_url = None;
        self
    }

    /// Sets the request timeout in milliseconds.
    pub fn timeout(mut self, timeout_ms: u64) -> Self {
        self.config.timeout = Some(timeout_ms);
        self
    }

    /// Sets the retry policy.
    pub fn retry(mut self, attempts: u32, delay_ms: u64) -> Self {
        self.config.retry = Some(RetryConfig::new(attempts, delay_ms));
        self
    }

    /// Registers a hook. Hooks run in registration order.
    pub fn hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Sets a custom transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets an auth provider.
    pub fn auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Builds the client.
    pub fn build(self) -> SdkResult<UserPermissionsApi> {
        if let Some(base_url) = &self.config.base_url {
            validate_base_url(base_url)?;
        }
        if let Some(auth) = &self.auth {
            auth.validate()?;
        }

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => {
                let timeout = self.config.timeout.unwrap_or(DEFAULT_TIMEOUT_MS);
                Arc::new(ReqwestTransport::new(Duration::from_millis(timeout))?)
            }
        };

        tracing::debug!(
            hooks = self.hooks.len(),
            auth = self.auth.is_some(),
            "Building client"
        );

        let chain = RequestChain::standard(self.hooks.clone(), transport);
        let executor =
            Arc::new(RequestExecutor::new(chain, self.config, self.auth).with_hooks(self.hooks));

        Ok(UserPermissionsApi {
            users: Arc::new(UsersService::new(Arc::clone(&executor))),
            permissions: Arc::new(PermissionsService::new(Arc::clone(&executor))),
            executor,
        })
    }
}

impl Default for UserPermissionsApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UserPermissionsApiBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPermissionsApiBuilder")
            .field("config", &self.config)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockTransport, RecordingHook};
    use serde_json::json;

    fn list_body() -> serde_json::Value {
        json!({"users": [], "total": 0, "limit": 20, "offset": 0})
    }

    #[test]
    fn test_builder_rejects_bad_base_url() {
        let result = UserPermissionsApi::builder()
            .base_url("ftp://example.com")
            .transport(Arc::new(MockTransport::new()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_empty_token() {
        let result = UserPermissionsApi::builder()
            .auth(Arc::new(crate::auth::BearerToken::from_string("")))
            .transport(Arc::new(MockTransport::new()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_sdk_level_settings_reach_requests() {
        let transport = MockTransport::new().with_json(200, list_body()).repeat_last();
        let requests = transport.requests_handle();
        let client = UserPermissionsApi::builder()
            .transport(Arc::new(transport))
            .build()
            .unwrap();

        client.users().list_users(None).unwrap();
        client.set_environment(Environment::Localhost4000).set_timeout(750);
        client.users().list_users(None).unwrap();

        let sent = requests.lock().unwrap();
        assert_eq!(sent[0].url, "http://localhost:3000/v1/users");
        assert_eq!(sent[0].timeout, Some(Duration::from_millis(DEFAULT_TIMEOUT_MS)));
        assert_eq!(sent[1].url, "http://localhost:4000/v1/users");
        assert_eq!(sent[1].timeout, Some(Duration::from_millis(750)));
    }

    #[test]
    fn test_hooks_registered_through_builder() {
        let recorder = RecordingHook::new();
        let client = UserPermissionsApi::builder()
            .hook(Arc::new(recorder.named("first")))
            .hook(Arc::new(recorder.named("second")))
            .transport(Arc::new(MockTransport::new().with_json(200, list_body())))
            .build()
            .unwrap();

        client.users().list_users(None).unwrap();

        assert_eq!(
            recorder.calls(),
            vec![
                "first.before_request",
                "second.before_request",
                "first.after_response",
                "second.after_response"
            ]
        );
    }

    #[test]
    fn test_set_config_replaces_record() {
        let client = UserPermissionsApi::builder()
            .timeout(100)
            .retry(3, 10)
            .transport(Arc::new(MockTransport::new()))
            .build()
            .unwrap();

        client
            .set_config(SdkConfig::new().environment(Environment::Localhost4000))
            .unwrap();

        let config = client.config();
        assert_eq!(config.timeout, None);
        assert_eq!(config.retry, None);
        assert_eq!(config.environment, Some(Environment::Localhost4000));
    }

    #[tokio::test]
    async fn test_async_client_shares_configuration() {
        let transport = MockTransport::new().with_json(200, list_body());
        let requests = transport.requests_handle();
        let client = UserPermissionsApi::builder()
            .transport(Arc::new(transport))
            .build()
            .unwrap();
        let async_client = client.to_async();

        client.set_base_url("http://localhost:9000/api").unwrap();
        async_client.users().list_users(None).await.unwrap();

        assert_eq!(
            requests.lock().unwrap()[0].url,
            "http://localhost:9000/api/users"
        );
    }
}
