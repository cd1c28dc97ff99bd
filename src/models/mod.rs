//! Request and response models.
//!
//! Models serialize with the API's camelCase keys. Inputs are checked with
//! [`Validate`] before a request is built; decoded responses are checked with
//! the same trait unless response validation is switched off.

mod permissions;
mod users;

pub use permissions::{Permission, PermissionsList};
pub use users::{
    CreateUserRequest, GrantUserPermissionRequest, UpdateUserPermissionsRequest, User, UserList,
    UserPermissions,
};

use crate::errors::{SdkError, SdkResult};

/// Longest identifier the API accepts.
pub const MAX_ID_LENGTH: usize = 128;

/// Explicit validation of a model value.
pub trait Validate {
    /// Returns a [`SdkError::Validation`] naming the first offending field.
    fn validate(&self) -> SdkResult<()>;
}

impl Validate for () {
    fn validate(&self) -> SdkResult<()> {
        Ok(())
    }
}

impl Validate for serde_json::Value {
    fn validate(&self) -> SdkResult<()> {
        Ok(())
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> SdkResult<()> {
        self.iter().try_for_each(Validate::validate)
    }
}

impl<T: Validate> Validate for Option<T> {
    fn validate(&self) -> SdkResult<()> {
        self.as_ref().map_or(Ok(()), Validate::validate)
    }
}

/// Checks an identifier: non-blank and at most [`MAX_ID_LENGTH`] characters.
pub fn validate_id(value: &str, field: &str) -> SdkResult<()> {
    if value.trim().is_empty() {
        return Err(SdkError::validation_field(
            format!("{} must not be empty", field),
            field,
        ));
    }
    if value.chars().count() > MAX_ID_LENGTH {
        return Err(SdkError::validation_field(
            format!("{} must be at most {} characters", field, MAX_ID_LENGTH),
            field,
        ));
    }
    Ok(())
}
