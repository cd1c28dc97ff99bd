//! Request execution shared by all services.
//!
//! Services hold an `Arc<RequestExecutor>` rather than inheriting behavior.
//! The executor owns the pipeline, the SDK-level configuration record and
//! the headers added to every call. For each call it resolves the
//! configuration once, builds the [`Request`] from that snapshot and turns
//! the pipeline's [`Response`] into a typed [`ApiResponse`].

use ::http::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tracing::instrument;

use crate::auth::AuthProvider;
use crate::config::{validate_base_url, ConfigResolver, EffectiveConfig, SdkConfig};
use crate::errors::{SdkError, SdkResult};
use crate::hooks::Hook;
use crate::models::Validate;
use crate::pipeline::RequestChain;
use crate::transport::{HttpMethod, Request, Response, ResponseStream};

/// `user-agent` sent with every request.
pub const USER_AGENT_VALUE: &str = concat!("user-permissions-api-rust/", env!("CARGO_PKG_VERSION"));

/// Status code and headers of the final response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMetadata {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    pub headers: HeaderMap,
}

/// Result of a successful call.
///
/// All three parts are always present. A 2xx response without a body yields
/// the data type's empty value (`Default`), e.g. an empty page or `None`.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    /// Decoded body.
    pub data: T,
    /// The response as received.
    pub raw: Response,
    /// Status and headers.
    pub metadata: ResponseMetadata,
}

impl<T> ApiResponse<T> {
    /// Maps the decoded body, keeping the raw response and metadata.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ApiResponse<U> {
        ApiResponse {
            data: f(self.data),
            raw: self.raw,
            metadata: self.metadata,
        }
    }

    /// Returns the decoded body.
    pub fn into_data(self) -> T {
        self.data
    }
}

/// Builds and runs requests.
pub struct RequestExecutor {
    chain: RequestChain,
    sdk_config: RwLock<SdkConfig>,
    default_headers: HeaderMap,
    auth: Option<Arc<dyn AuthProvider>>,
    hooks: Vec<Arc<dyn Hook>>,
}

impl RequestExecutor {
    /// Creates an executor over a chain with the given SDK-level record.
    pub fn new(
        chain: RequestChain,
        sdk_config: SdkConfig,
        auth: Option<Arc<dyn AuthProvider>>,
    ) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Self {
            chain,
            sdk_config: RwLock::new(sdk_config),
            default_headers,
            auth,
            hooks: Vec::new(),
        }
    }

    /// Sets the hooks told about responses that fail to decode.
    ///
    /// These should be the hooks of the chain: the chain reports transport
    /// and HTTP failures, the executor reports what happens after it.
    pub fn with_hooks(mut self, hooks: Vec<Arc<dyn Hook>>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Returns a snapshot of the SDK-level record.
    pub fn sdk_config(&self) -> SdkConfig {
        match self.sdk_config.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Modifies the SDK-level record. Calls already in flight are unaffected.
    pub fn update_sdk_config<F: FnOnce(&mut SdkConfig)>(&self, update: F) {
        let mut guard = match self.sdk_config.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        update(&mut guard);
    }

    /// Resolves the effective configuration for one call.
    pub fn resolve(
        &self,
        service: Option<&SdkConfig>,
        method: Option<&SdkConfig>,
        request: Option<&SdkConfig>,
    ) -> EffectiveConfig {
        let sdk = self.sdk_config();
        ConfigResolver::resolve_levels(Some(&sdk), service, method, request)
    }

    /// Builds a request for `segments` under the resolved base URL.
    ///
    /// Path segments are percent-encoded. Write methods carrying a body get a
    /// JSON `content-type`.
    pub fn build_request<B: Serialize>(
        &self,
        method: HttpMethod,
        config: &EffectiveConfig,
        segments: &[&str],
        body: Option<&B>,
    ) -> SdkResult<Request> {
        let url = endpoint(config.url(), segments)?;

        let mut request = Request::new(method, url)
            .with_timeout(config.timeout())
            .with_retry(config.retry());
        request.headers = self.default_headers.clone();

        if let Some(body) = body {
            request = request.with_json(serde_json::to_value(body)?);
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        if let Some(auth) = &self.auth {
            auth.apply_auth(&mut request.headers)?;
        }

        Ok(request)
    }

    /// Sends a request and decodes the body into `T`.
    ///
    /// An empty body yields `T::default()` and skips validation. Otherwise the
    /// decoded value is validated when `validate_response` is set. Decode and
    /// validation failures are passed to the hooks' `on_error` before being
    /// returned; a body that does not decode comes back as
    /// [`SdkError::Decode`] holding the response.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub fn execute<T>(&self, request: Request, validate_response: bool) -> SdkResult<ApiResponse<T>>
    where
        T: DeserializeOwned + Validate + Default,
    {
        let observed = (!self.hooks.is_empty()).then(|| request.clone());
        let raw = self.chain.send(request)?;

        let data = match decode::<T>(&raw, validate_response) {
            Ok(data) => data,
            Err(error) => {
                let error = match error {
                    SdkError::Serialization { message } => SdkError::decode(message, raw),
                    other => other,
                };
                if let Some(request) = &observed {
                    for hook in &self.hooks {
                        hook.on_error(&error, request, error.response())?;
                    }
                }
                return Err(error);
            }
        };

        Ok(ApiResponse {
            data,
            metadata: ResponseMetadata {
                status_code: raw.status,
                headers: raw.headers.clone(),
            },
            raw,
        })
    }

    /// Sends a request and returns its body as a lazy chunk sequence.
    pub fn stream(&self, request: Request) -> SdkResult<ResponseStream> {
        self.chain.stream(request)
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("chain", &self.chain)
            .field("sdk_config", &self.sdk_config())
            .field("auth", &self.auth.as_ref().map(|a| a.scheme().to_string()))
            .finish()
    }
}

fn decode<T>(raw: &Response, validate_response: bool) -> SdkResult<T>
where
    T: DeserializeOwned + Validate + Default,
{
    if raw.body.is_empty() {
        return Ok(T::default());
    }

    let data: T = raw.json()?;
    if validate_response {
        data.validate().map_err(|e| match e {
            SdkError::Validation { message, field } => SdkError::Validation {
                message: format!("Response failed validation: {}", message),
                field,
            },
            other => other,
        })?;
    }
    Ok(data)
}

fn endpoint(base_url: &str, segments: &[&str]) -> SdkResult<String> {
    validate_base_url(base_url)?;
    let mut url = url::Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|_| SdkError::configuration(format!("'{}' cannot be a base URL", base_url)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BearerToken;
    use crate::config::Environment;
    use crate::mocks::{MockTransport, RecordingHook};
    use crate::models::{UserList, UserPermissions};
    use crate::pipeline::{HookHandler, TransportHandler};
    use crate::transport::ResponseBody;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn executor(transport: MockTransport) -> RequestExecutor {
        let chain = RequestChain::new().add_handler(TransportHandler::new(Arc::new(transport)));
        RequestExecutor::new(chain, SdkConfig::new(), None)
    }

    #[test]
    fn test_endpoint_joins_and_encodes_segments() {
        assert_eq!(
            endpoint("http://localhost:3000/v1", &["users", "user 1", "permissions"]).unwrap(),
            "http://localhost:3000/v1/users/user%201/permissions"
        );
        assert_eq!(
            endpoint("http://localhost:3000/v1/", &["users"]).unwrap(),
            "http://localhost:3000/v1/users"
        );
        assert!(endpoint("ftp://localhost", &["users"]).is_err());
        assert!(endpoint("not a url", &["users"]).is_err());
    }

    #[test]
    fn test_build_request_uses_effective_config() {
        let executor = executor(MockTransport::new());
        let config = ConfigResolver::resolve([Some(
            &SdkConfig::new()
                .environment(Environment::Localhost4000)
                .timeout_ms(2500)
                .retry(3, 10),
        )]);

        let request = executor
            .build_request::<()>(HttpMethod::Get, &config, &["users"], None)
            .unwrap();

        assert_eq!(request.url, "http://localhost:4000/v1/users");
        assert_eq!(request.timeout, Some(std::time::Duration::from_millis(2500)));
        assert_eq!(request.retry.attempts, 3);
        assert_eq!(request.header("accept"), Some("application/json"));
        assert!(request.header("content-type").is_none());
    }

    #[test]
    fn test_build_request_with_body_and_auth() {
        let chain = RequestChain::new();
        let auth: Arc<dyn AuthProvider> = Arc::new(BearerToken::from_string("t0ken"));
        let executor = RequestExecutor::new(chain, SdkConfig::new(), Some(auth));

        let request = executor
            .build_request(
                HttpMethod::Post,
                &EffectiveConfig::default(),
                &["users"],
                Some(&json!({"name": "Kim"})),
            )
            .unwrap();

        assert_eq!(request.url, "http://localhost:3000/v1/users");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("authorization"), Some("Bearer t0ken"));
    }

    #[test]
    fn test_execute_returns_data_raw_and_metadata() {
        let transport = MockTransport::new().with_json(
            200,
            json!({"users": [{"id": "user-1"}], "total": 1, "limit": 20, "offset": 0}),
        );
        let executor = executor(transport);

        let response: ApiResponse<UserList> = executor
            .execute(Request::get("http://localhost:3000/v1/users"), true)
            .unwrap();

        assert_eq!(response.data.users[0].id, "user-1");
        assert_eq!(response.metadata.status_code, 200);
        assert_eq!(response.raw.status, 200);
        assert_eq!(
            response.metadata.headers.get("content-type").unwrap(),
            "application/json"
        );
    }

    fn hooked_executor(transport: MockTransport, hook: &RecordingHook) -> RequestExecutor {
        let hooks: Vec<Arc<dyn Hook>> = vec![Arc::new(hook.clone())];
        let chain = RequestChain::new()
            .add_handler(HookHandler::new(hooks.clone()))
            .add_handler(TransportHandler::new(Arc::new(transport)));
        RequestExecutor::new(chain, SdkConfig::new(), None).with_hooks(hooks)
    }

    #[test]
    fn test_empty_success_body_yields_empty_value() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("req-1"));
        let transport =
            MockTransport::new().with_response(Response::new(200, headers, ResponseBody::Empty));
        let executor = executor(transport);

        let response = executor
            .execute::<UserList>(Request::get("http://localhost:3000/v1/users"), true)
            .unwrap();

        assert_eq!(response.data, UserList::default());
        assert!(response.raw.body.is_empty());
        assert_eq!(response.metadata.status_code, 200);
        assert_eq!(response.metadata.headers.get("x-request-id").unwrap(), "req-1");
    }

    #[test]
    fn test_undecodable_body_keeps_response_and_reaches_on_error() {
        let hook = RecordingHook::new();
        let transport = MockTransport::new().with_json(200, json!({"unexpected": true}));
        let executor = hooked_executor(transport, &hook);

        let err = executor
            .execute::<UserPermissions>(
                Request::get("http://localhost:3000/v1/users/user-1/permissions"),
                true,
            )
            .unwrap_err();

        assert!(matches!(err, SdkError::Decode { .. }));
        assert_eq!(err.response().unwrap().body.as_json().unwrap()["unexpected"], true);
        assert_eq!(
            hook.calls(),
            vec!["hook.before_request", "hook.after_response", "hook.on_error"]
        );
        assert_eq!(hook.error_statuses(), vec![Some(200)]);
    }

    #[test]
    fn test_response_validation_toggle() {
        let body = json!({"users": [{"id": ""}], "total": 1, "limit": 20, "offset": 0});

        let strict = executor(MockTransport::new().with_json(200, body.clone()));
        let err = strict
            .execute::<UserList>(Request::get("http://localhost:3000/v1/users"), true)
            .unwrap_err();
        assert!(matches!(err, SdkError::Validation { .. }));

        let lenient = executor(MockTransport::new().with_json(200, body));
        assert!(lenient
            .execute::<UserList>(Request::get("http://localhost:3000/v1/users"), false)
            .is_ok());
    }

    #[test]
    fn test_sdk_config_update_does_not_touch_resolved_snapshot() {
        let executor = executor(MockTransport::new());
        let before = executor.resolve(None, None, None);

        executor.update_sdk_config(|c| c.timeout = Some(10));

        assert_eq!(before.timeout, None);
        assert_eq!(executor.resolve(None, None, None).timeout, Some(10));
    }
}
