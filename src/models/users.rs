//! User models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{validate_id, Permission, Validate};
use crate::errors::{SdkError, SdkResult};

/// A user account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable identifier, e.g. `user-1`.
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Validate for User {
    fn validate(&self) -> SdkResult<()> {
        validate_id(&self.id, "id")?;
        if let (Some(created), Some(updated)) = (self.created_at, self.updated_at) {
            if updated < created {
                return Err(SdkError::validation_field(
                    "updatedAt precedes createdAt",
                    "updatedAt",
                ));
            }
        }
        Ok(())
    }
}

/// One page of users.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserList {
    /// Users on this page.
    pub users: Vec<User>,
    /// Total number of users.
    pub total: u64,
    /// Page size.
    pub limit: u32,
    /// Index of the first item on this page.
    pub offset: u64,
}

impl Validate for UserList {
    fn validate(&self) -> SdkResult<()> {
        if self.users.len() > self.limit as usize {
            return Err(SdkError::validation_field(
                "page holds more users than its limit",
                "users",
            ));
        }
        self.users.validate()
    }
}

/// The permissions currently held by a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPermissions {
    /// The user the permissions belong to.
    pub user_id: String,
    /// Granted permissions.
    pub permissions: Vec<Permission>,
}

impl UserPermissions {
    /// Returns true if the permission with `id` is held.
    pub fn has(&self, id: &str) -> bool {
        self.permissions.iter().any(|p| p.id == id)
    }
}

impl Validate for UserPermissions {
    fn validate(&self) -> SdkResult<()> {
        validate_id(&self.user_id, "userId")?;
        self.permissions.validate()
    }
}

/// Body of a grant request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantUserPermissionRequest {
    /// Permission to grant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    /// Whether the permission is granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granted: Option<bool>,
}

impl GrantUserPermissionRequest {
    /// Creates a request granting `permission`.
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: Some(permission.into()),
            granted: Some(true),
        }
    }
}

impl Validate for GrantUserPermissionRequest {
    fn validate(&self) -> SdkResult<()> {
        match &self.permission {
            Some(permission) => validate_id(permission, "permission"),
            None => Ok(()),
        }
    }
}

/// Body of an update request: the complete new set of permissions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPermissionsRequest {
    /// Permission identifiers replacing the user's current set.
    pub permission_ids: Vec<String>,
}

impl UpdateUserPermissionsRequest {
    /// Creates an update request.
    pub fn new<I, S>(permission_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permission_ids: permission_ids.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validate for UpdateUserPermissionsRequest {
    fn validate(&self) -> SdkResult<()> {
        if self.permission_ids.is_empty() {
            return Err(SdkError::validation_field(
                "permissionIds must not be empty",
                "permissionIds",
            ));
        }

        let mut seen = HashSet::new();
        for (index, id) in self.permission_ids.iter().enumerate() {
            validate_id(id, &format!("permissionIds[{}]", index))?;
            if !seen.insert(id.as_str()) {
                return Err(SdkError::validation_field(
                    "permissionIds must contain unique items",
                    "permissionIds",
                ));
            }
        }
        Ok(())
    }
}

/// Body of a create-user request.
///
/// `name` and `email` are the known fields; anything else is passed through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Additional fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CreateUserRequest {
    /// Creates a request for a user with a name and email.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
            extra: serde_json::Map::new(),
        }
    }

    /// Adds an extra field.
    pub fn field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> SdkResult<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(SdkError::validation_field("name must not be empty", "name"));
            }
        }
        if let Some(email) = &self.email {
            let well_formed = email
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
            if !well_formed {
                return Err(SdkError::validation_field(
                    format!("'{}' is not a valid email address", email),
                    "email",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_user_list_deserialize() {
        let body = json!({
            "users": [{
                "id": "user-1",
                "name": "Alice Johnson",
                "email": "alice.johnson@techcorp.com",
                "createdAt": "2024-01-15T10:30:00Z",
                "updatedAt": "2024-01-20T14:45:00Z"
            }],
            "total": 10,
            "limit": 20,
            "offset": 0
        });

        let list: UserList = serde_json::from_value(body).unwrap();

        assert_eq!(list.total, 10);
        assert_eq!(list.users[0].email.as_deref(), Some("alice.johnson@techcorp.com"));
        assert!(list.validate().is_ok());
    }

    #[test]
    fn test_user_timestamps_must_be_ordered() {
        let user: User = serde_json::from_value(json!({
            "id": "user-1",
            "createdAt": "2024-01-20T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert!(user.validate().is_err());
    }

    #[test]
    fn test_user_permissions_has() {
        let perms: UserPermissions = serde_json::from_value(json!({
            "userId": "user-2",
            "permissions": [
                {"id": "perm-read-users", "name": "Read Users"},
                {"id": "perm-write-users", "name": "Write Users"}
            ]
        }))
        .unwrap();

        assert!(perms.has("perm-write-users"));
        assert!(!perms.has("perm-admin"));
        assert!(perms.validate().is_ok());
    }

    #[test]
    fn test_update_request_serializes_camel_case() {
        let request = UpdateUserPermissionsRequest::new(["perm-read-users", "perm-admin"]);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"permissionIds": ["perm-read-users", "perm-admin"]})
        );
    }

    #[test]
    fn test_update_request_validation() {
        assert!(UpdateUserPermissionsRequest::new(Vec::<String>::new())
            .validate()
            .is_err());
        assert!(UpdateUserPermissionsRequest::new(["perm-admin", "perm-admin"])
            .validate()
            .is_err());

        let err = UpdateUserPermissionsRequest::new(["perm-admin", ""])
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            SdkError::Validation { field: Some(ref f), .. } if f == "permissionIds[1]"
        ));
    }

    #[test]
    fn test_grant_request() {
        let request = GrantUserPermissionRequest::new("perm-admin");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"permission": "perm-admin", "granted": true})
        );
        assert!(GrantUserPermissionRequest::default().validate().is_ok());
        assert!(GrantUserPermissionRequest::new("").validate().is_err());
    }

    #[test]
    fn test_create_user_request_extra_fields() {
        let request = CreateUserRequest::new("Kim Lee", "kim.lee@techcorp.com")
            .field("department", json!("engineering"));

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "name": "Kim Lee",
                "email": "kim.lee@techcorp.com",
                "department": "engineering"
            })
        );
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_user_request_rejects_bad_email() {
        let err = CreateUserRequest::new("Kim Lee", "not-an-email")
            .validate()
            .unwrap_err();
        assert!(matches!(err, SdkError::Validation { field: Some(ref f), .. } if f == "email"));
    }
}
