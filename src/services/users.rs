//! Users service.

use std::sync::Arc;
use tracing::instrument;

use super::{run_blocking, ServiceCore};
use crate::config::SdkConfig;
use crate::errors::SdkResult;
use crate::executor::{ApiResponse, RequestExecutor};
use crate::models::{
    validate_id, CreateUserRequest, GrantUserPermissionRequest, UpdateUserPermissionsRequest, User,
    UserList, UserPermissions, Validate,
};
use crate::transport::{HttpMethod, ResponseStream};

const LIST_USERS: &str = "list_users";
const GET_USER_PERMISSIONS: &str = "get_user_permissions";
const UPDATE_USER_PERMISSIONS: &str = "update_user_permissions";
const GRANT_USER_PERMISSION: &str = "grant_user_permission";
const DELETE_USERS: &str = "delete_users";
const CREATE_NEW_USER: &str = "create_new_user";

/// Operations on users and their permissions.
///
/// Every operation accepts an optional request-level [`SdkConfig`] that takes
/// precedence over the method, service and SDK levels.
#[derive(Debug)]
pub struct UsersService {
    core: ServiceCore,
}

impl UsersService {
    /// Creates a users service over a shared executor.
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

    /// Sets the method-level configuration for [`UsersService::list_users`].
    pub fn set_list_users_config(&self, config: SdkConfig) -> &Self {
        self.core.set_method_config(LIST_USERS, config);
        self
    }

    /// Sets the method-level configuration for [`UsersService::get_user_permissions`].
    pub fn set_get_user_permissions_config(&self, config: SdkConfig) -> &Self {
        self.core.set_method_config(GET_USER_PERMISSIONS, config);
        self
    }

    /// Sets the method-level configuration for [`UsersService::update_user_permissions`].
    pub fn set_update_user_permissions_config(&self, config: SdkConfig) -> &Self {
        self.core.set_method_config(UPDATE_USER_PERMISSIONS, config);
        self
    }

    /// Sets the method-level configuration for [`UsersService::grant_user_permission`].
    pub fn set_grant_user_permission_config(&self, config: SdkConfig) -> &Self {
        self.core.set_method_config(GRANT_USER_PERMISSION, config);
        self
    }

    /// Sets the method-level configuration for [`UsersService::delete_users`].
    pub fn set_delete_users_config(&self, config: SdkConfig) -> &Self {
        self.core.set_method_config(DELETE_USERS, config);
        self
    }

    /// Sets the method-level configuration for [`UsersService::create_new_user`].
    pub fn set_create_new_user_config(&self, config: SdkConfig) -> &Self {
        self.core.set_method_config(CREATE_NEW_USER, config);
        self
    }

    /// `GET /users`
    #[instrument(skip(self, request_config))]
    pub fn list_users(
        &self,
        request_config: Option<&SdkConfig>,
    ) -> SdkResult<ApiResponse<UserList>> {
        self.core
            .call::<_, ()>(LIST_USERS, HttpMethod::Get, &["users"], None, request_config)
    }

    /// `GET /users` as a lazy chunk stream.
    ///
    /// Uses the same configuration levels as [`UsersService::list_users`].
    #[instrument(skip(self, request_config))]
    pub fn list_users_stream(
        &self,
        request_config: Option<&SdkConfig>,
    ) -> SdkResult<ResponseStream> {
        self.core.stream(LIST_USERS, &["users"], request_config)
    }

    /// `GET /users/{userId}/permissions`
    #[instrument(skip(self, request_config), fields(user_id = %user_id))]
    pub fn get_user_permissions(
        &self,
        user_id: &str,
        request_config: Option<&SdkConfig>,
    ) -> SdkResult<ApiResponse<UserPermissions>> {
        validate_id(user_id, "userId")?;

        self.core.call::<_, ()>(
            GET_USER_PERMISSIONS,
            HttpMethod::Get,
            &["users", user_id, "permissions"],
            None,
            request_config,
        )
    }

    /// `PUT /users/{userId}/permissions`: replaces the user's permissions.
    #[instrument(skip(self, request_body, request_config), fields(user_id = %user_id))]
    pub fn update_user_permissions(
        &self,
        request_body: &UpdateUserPermissionsRequest,
        user_id: &str,
        request_config: Option<&SdkConfig>,
    ) -> SdkResult<ApiResponse<UserPermissions>> {
        request_body.validate()?;
        validate_id(user_id, "userId")?;

        self.core.call(
            UPDATE_USER_PERMISSIONS,
            HttpMethod::Put,
            &["users", user_id, "permissions"],
            Some(request_body),
            request_config,
        )
    }

    /// `POST /users/{userId}/permissions`: adds a permission.
    #[instrument(skip(self, request_body, request_config), fields(user_id = %user_id))]
    pub fn grant_user_permission(
        &self,
        request_body: &GrantUserPermissionRequest,
        user_id: &str,
        request_config: Option<&SdkConfig>,
    ) -> SdkResult<ApiResponse<UserPermissions>> {
        request_body.validate()?;
        validate_id(user_id, "userId")?;

        self.core.call(
            GRANT_USER_PERMISSION,
            HttpMethod::Post,
            &["users", user_id, "permissions"],
            Some(request_body),
            request_config,
        )
    }

    /// `DELETE /users/{userId}`
    ///
    /// The API answers 204, so `data` is normally `None`.
    #[instrument(skip(self, request_config), fields(user_id = %user_id))]
    pub fn delete_users(
        &self,
        user_id: &str,
        request_config: Option<&SdkConfig>,
    ) -> SdkResult<ApiResponse<Option<serde_json::Value>>> {
        validate_id(user_id, "userId")?;

        self.core.call::<_, ()>(
            DELETE_USERS,
            HttpMethod::Delete,
            &["users", user_id],
            None,
            request_config,
        )
    }

    /// `POST /users`
    #[instrument(skip(self, request_body, request_config))]
    pub fn create_new_user(
        &self,
        request_body: &CreateUserRequest,
        request_config: Option<&SdkConfig>,
    ) -> SdkResult<ApiResponse<User>> {
        request_body.validate()?;

        self.core.call(
            CREATE_NEW_USER,
            HttpMethod::Post,
            &["users"],
            Some(request_body),
            request_config,
        )
    }
}

/// Async variant of [`UsersService`].
///
/// Each call runs the blocking operation on Tokio's blocking pool. Setters
/// are not duplicated here; configure through [`UsersServiceAsync::inner`].
#[derive(Debug, Clone)]
pub struct UsersServiceAsync {
    inner: Arc<UsersService>,
}

impl UsersServiceAsync {
    /// Wraps a users service.
    pub fn new(inner: Arc<UsersService>) -> Self {
        Self { inner }
    }

    /// The wrapped blocking service.
    pub fn inner(&self) -> &UsersService {
        &self.inner
    }

    /// `GET /users`
    pub async fn list_users(
        &self,
        request_config: Option<SdkConfig>,
    ) -> SdkResult<ApiResponse<UserList>> {
        let service = Arc::clone(&self.inner);
        run_blocking(move || service.list_users(request_config.as_ref())).await
    }

    /// `GET /users/{userId}/permissions`
    pub async fn get_user_permissions(
        &self,
        user_id: impl Into<String>,
        request_config: Option<SdkConfig>,
    ) -> SdkResult<ApiResponse<UserPermissions>> {
        let service = Arc::clone(&self.inner);
        let user_id = user_id.into();
        run_blocking(move || service.get_user_permissions(&user_id, request_config.as_ref())).await
    }

    /// `PUT /users/{userId}/permissions`
    pub async fn update_user_permissions(
        &self,
        request_body: UpdateUserPermissionsRequest,
        user_id: impl Into<String>,
        request_config: Option<SdkConfig>,
    ) -> SdkResult<ApiResponse<UserPermissions>> {
        let service = Arc::clone(&self.inner);
        let user_id = user_id.into();
        run_blocking(move || {
            service.update_user_permissions(&request_body, &user_id, request_config.as_ref())
        })
        .await
    }

    /// `POST /users/{userId}/permissions`
    pub async fn grant_user_permission(
        &self,
        request_body: GrantUserPermissionRequest,
        user_id: impl Into<String>,
        request_config: Option<SdkConfig>,
    ) -> SdkResult<ApiResponse<UserPermissions>> {
        let service = Arc::clone(&self.inner);
        let user_id = user_id.into();
        run_blocking(move || {
            service.grant_user_permission(&request_body, &user_id, request_config.as_ref())
        })
        .await
    }

    /// `DELETE /users/{userId}`
    pub async fn delete_users(
        &self,
        user_id: impl Into<String>,
        request_config: Option<SdkConfig>,
    ) -> SdkResult<ApiResponse<Option<serde_json::Value>>> {
        let service = Arc::clone(&self.inner);
        let user_id = user_id.into();
        run_blocking(move || service.delete_users(&user_id, request_config.as_ref())).await
    }

    /// `POST /users`
    pub async fn create_new_user(
        &self,
        request_body: CreateUserRequest,
        request_config: Option<SdkConfig>,
    ) -> SdkResult<ApiResponse<User>> {
        let service = Arc::clone(&self.inner);
        run_blocking(move || service.create_new_user(&request_body, request_config.as_ref())).await
    }
}
