//! Permissions service.

use std::sync::Arc;
use tracing::instrument;

use super::{run_blocking, ServiceCore};
use crate::config::SdkConfig;
use crate::errors::SdkResult;
use crate::executor::{ApiResponse, RequestExecutor};
use crate::models::PermissionsList;
use crate::transport::HttpMethod;

const LIST_PERMISSIONS: &str = "list_permissions";

/// Operations on the permission catalogue.
#[derive(Debug)]
pub struct PermissionsService {
    core: ServiceCore,
}

impl PermissionsService {
    /// Creates a permissions service over a shared executor.
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self {
            core: ServiceCore::new(executor),
        }
    }

    /// Returns the service-level configuration record.
    pub fn config(&self) -> SdkConfig {
        self.core.config()
    }

    /// Replaces the service-level configuration record.
    pub fn set_config(&self, config: SdkConfig) -> &Self {
        self.core.set_config(config);
        self
    }

    /// Sets the service-level base URL.
    pub fn set_base_url(&self, base_url: &str) -> SdkResult<&Self> {
        self.core.set_base_url(base_url)?;
        Ok(self)
    }

    /// Sets the service-level timeout in milliseconds.
    pub fn set_timeout(&self, timeout_ms: u64) -> &Self {
        self.core.set_timeout(timeout_ms);
        self
    }

    /// Sets the method-level configuration for [`PermissionsService::list_permissions`].
    pub fn set_list_permissions_config(&self, config: SdkConfig) -> &Self {
        self.core.set_method_config(LIST_PERMISSIONS, config);
        self
    }

    /// `GET /permissions`
    #[instrument(skip(self, request_config))]
    pub fn list_permissions(
        &self,
        request_config: Option<&SdkConfig>,
    ) -> SdkResult<ApiResponse<PermissionsList>> {
        self.core.call::<_, ()>(
            LIST_PERMISSIONS,
            HttpMethod::Get,
            &["permissions"],
            None,
            request_config,
        )
    }
}

/// Async variant of [`PermissionsService`].
#[derive(Debug, Clone)]
pub struct PermissionsServiceAsync {
    inner: Arc<PermissionsService>,
}

impl PermissionsServiceAsync {
    /// Wraps a permissions service.
    pub fn new(inner: Arc<PermissionsService>) -> Self {
        Self { inner }
    }

    /// The wrapped blocking service.
    pub fn inner(&self) -> &PermissionsService {
        &self.inner
    }

    /// `GET /permissions`
    pub async fn list_permissions(
        &self,
        request_config: Option<SdkConfig>,
    ) -> SdkResult<ApiResponse<PermissionsList>> {
        let service = Arc::clone(&self.inner);
        run_blocking(move || service.list_permissions(request_config.as_ref())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::errors::SdkError;
    use crate::mocks::MockTransport;
    use crate::pipeline::RequestChain;
    use serde_json::json;

    fn catalogue() -> serde_json::Value {
        json!({
            "permissions": [
                {"id": "perm-read-users", "name": "Read Users", "category": "users"},
                {"id": "perm-admin", "name": "Admin", "category": "admin"}
            ],
            "total": 6,
            "limit": 2,
            "offset": 0
        })
    }

    fn service(transport: MockTransport) -> PermissionsService {
        let chain = RequestChain::standard(Vec::new(), Arc::new(transport));
        PermissionsService::new(Arc::new(RequestExecutor::new(chain, SdkConfig::new(), None)))
    }

    #[test]
    fn test_list_permissions() {
        let transport = MockTransport::new().with_json(200, catalogue());
        let requests = transport.requests_handle();
        let permissions = service(transport);

        let response = permissions.list_permissions(None).unwrap();

        assert_eq!(response.data.permissions.len(), 2);
        assert_eq!(response.data.total, 6);
        assert_eq!(
            requests.lock().unwrap()[0].url,
            "http://localhost:3000/v1/permissions"
        );
    }

    #[test]
    fn test_method_environment_overrides_service_base_url() {
        let transport = MockTransport::new().with_json(200, catalogue());
        let requests = transport.requests_handle();
        let permissions = service(transport);

        permissions
            .set_base_url("http://permissions.internal/v1")
            .unwrap()
            .set_list_permissions_config(SdkConfig::new().environment(Environment::Localhost4000));
        permissions.list_permissions(None).unwrap();

        assert_eq!(
            requests.lock().unwrap()[0].url,
            "http://localhost:4000/v1/permissions"
        );
    }

    #[test]
    fn test_retry_from_request_level() {
        let transport = MockTransport::new()
            .with_json(500, json!({"code": "INTERNAL", "message": "boom"}))
            .with_json(200, catalogue());
        let requests = transport.requests_handle();
        let permissions = service(transport);

        let response = permissions
            .list_permissions(Some(&SdkConfig::new().retry(2, 0)))
            .unwrap();

        assert_eq!(response.metadata.status_code, 200);
        assert_eq!(requests.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_no_retry_by_default() {
        let transport = MockTransport::new()
            .with_json(500, json!({"code": "INTERNAL", "message": "boom"}))
            .with_json(200, catalogue());
        let permissions = service(transport);

        let err = permissions.list_permissions(None).unwrap_err();

        assert!(matches!(err, SdkError::Http { status: 500, .. }));
    }

    #[test]
    fn test_async_list_permissions() {
        let transport = MockTransport::new().with_json(200, catalogue());
        let permissions = PermissionsServiceAsync::new(Arc::new(service(transport)));

        let response = tokio_test::block_on(permissions.list_permissions(None)).unwrap();

        assert_eq!(response.data.permissions[1].id, "perm-admin");
    }
}
