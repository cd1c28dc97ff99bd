//! Authentication extension point.
//!
//! The API itself does not mandate a scheme. Deployments that sit behind a
//! gateway can plug in an [`AuthProvider`]; its headers are added to every
//! request before the hooks run.

use ::http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};

use crate::errors::{SdkError, SdkResult};

/// Authentication provider trait.
pub trait AuthProvider: Send + Sync {
    /// Adds authentication headers, replacing any existing values.
    fn apply_auth(&self, headers: &mut HeaderMap) -> SdkResult<()>;

    /// Name of the scheme, for diagnostics.
    fn scheme(&self) -> &str;

    /// Checks the credentials before they are used.
    fn validate(&self) -> SdkResult<()>;
}

fn secret_hint(secret: &SecretString) -> String {
    let value = secret.expose_secret();
    let count = value.chars().count();
    if count > 4 {
        let tail: String = value.chars().skip(count - 4).collect();
        format!("...{}", tail)
    } else {
        "****".to_string()
    }
}

fn sensitive_value(value: &str) -> SdkResult<HeaderValue> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|_| SdkError::configuration("Credential contains invalid header characters"))?;
    header.set_sensitive(true);
    Ok(header)
}

/// `Authorization: Bearer <token>`.
pub struct BearerToken {
    token: SecretString,
}

impl BearerToken {
    /// Creates a bearer token provider.
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }

    /// Creates from a plain string.
    pub fn from_string(token: impl Into<String>) -> Self {
        Self::new(SecretString::new(token.into()))
    }

    /// Last four characters of the token, for debugging.
    pub fn token_hint(&self) -> String {
        secret_hint(&self.token)
    }
}

impl AuthProvider for BearerToken {
    fn apply_auth(&self, headers: &mut HeaderMap) -> SdkResult<()> {
        let value = sensitive_value(&format!("Bearer {}", self.token.expose_secret()))?;
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    fn scheme(&self) -> &str {
        "Bearer"
    }

    fn validate(&self) -> SdkResult<()> {
        if self.token.expose_secret().trim().is_empty() {
            return Err(SdkError::configuration("Bearer token cannot be empty"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("token", &"[REDACTED]")
            .field("token_hint", &self.token_hint())
            .finish()
    }
}

/// An API key sent in a custom header, e.g. `x-api-key`.
pub struct ApiKeyHeader {
    header: HeaderName,
    key: SecretString,
}

impl ApiKeyHeader {
    /// Creates an API key provider for the given header name.
    pub fn new(header: &str, key: SecretString) -> SdkResult<Self> {
        let header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|e| SdkError::configuration(format!("Invalid auth header name: {}", e)))?;
        Ok(Self { header, key })
    }
}

impl AuthProvider for ApiKeyHeader {
    fn apply_auth(&self, headers: &mut HeaderMap) -> SdkResult<()> {
        let value = sensitive_value(self.key.expose_secret())?;
        headers.insert(self.header.clone(), value);
        Ok(())
    }

    fn scheme(&self) -> &str {
        "ApiKey"
    }

    fn validate(&self) -> SdkResult<()> {
        if self.key.expose_secret().trim().is_empty() {
            return Err(SdkError::configuration("API key cannot be empty"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ApiKeyHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyHeader")
            .field("header", &self.header)
            .field("key_hint", &secret_hint(&self.key))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_apply() {
        let auth = BearerToken::from_string("token-12345");
        let mut headers = HeaderMap::new();

        auth.apply_auth(&mut headers).unwrap();

        assert_eq!(headers.get("authorization").unwrap(), "Bearer token-12345");
        assert!(headers.get("authorization").unwrap().is_sensitive());
    }

    #[test]
    fn test_bearer_token_replaces_existing_header() {
        let auth = BearerToken::from_string("new");
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer old"));

        auth.apply_auth(&mut headers).unwrap();

        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer new");
    }

    #[test]
    fn test_bearer_token_validate_empty() {
        assert!(BearerToken::from_string("  ").validate().is_err());
        assert!(BearerToken::from_string("token").validate().is_ok());
    }

    #[test]
    fn test_token_hint() {
        assert_eq!(BearerToken::from_string("token-12345").token_hint(), "...2345");
        assert_eq!(BearerToken::from_string("abc").token_hint(), "****");
    }

    #[test]
    fn test_debug_redacts_token() {
        let auth = BearerToken::from_string("token-12345");
        let debug = format!("{:?}", auth);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("token-12345"));
    }

    #[test]
    fn test_api_key_header() {
        let auth = ApiKeyHeader::new("X-Api-Key", SecretString::new("k-1".into())).unwrap();
        let mut headers = HeaderMap::new();

        auth.apply_auth(&mut headers).unwrap();

        assert_eq!(headers.get("x-api-key").unwrap(), "k-1");
        assert_eq!(auth.scheme(), "ApiKey");
    }

    #[test]
    fn test_api_key_header_rejects_bad_name() {
        assert!(ApiKeyHeader::new("bad header", SecretString::new("k".into())).is_err());
    }
}
