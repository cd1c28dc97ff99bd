//! Permission models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{validate_id, Validate};
use crate::errors::{SdkError, SdkResult};

/// A permission that can be granted to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Stable identifier, e.g. `perm-read-users`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the permission allows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Grouping such as `users` or `admin`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Permission {
    /// Creates a permission with only its identifier and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            category: None,
            created_at: None,
        }
    }
}

impl Validate for Permission {
    fn validate(&self) -> SdkResult<()> {
        validate_id(&self.id, "id")
    }
}

/// One page of permissions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsList {
    /// Permissions on this page.
    pub permissions: Vec<Permission>,
    /// Total number of permissions.
    pub total: u64,
    /// Page size.
    pub limit: u32,
    /// Index of the first item on this page.
    pub offset: u64,
}

impl Validate for PermissionsList {
    fn validate(&self) -> SdkResult<()> {
        if self.permissions.len() as u64 > self.total {
            return Err(SdkError::validation_field(
                "page holds more permissions than the reported total",
                "total",
            ));
        }
        self.permissions.validate()
    }
}
