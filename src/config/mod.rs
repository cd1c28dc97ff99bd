//! Configuration model and hierarchical resolution.
//!
//! Configuration can be supplied at four levels. From lowest to highest
//! precedence: SDK, service, method and request. Each level is an
//! [`SdkConfig`] whose fields are all optional; an absent field defers to
//! the next lower level. [`ConfigResolver`] merges the levels field by field
//! into the [`EffectiveConfig`] used for a single call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{SdkError, SdkResult};

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Environment variable prefix read by [`SdkConfig::from_env`].
pub const ENV_PREFIX: &str = "USER_PERMISSIONS_API";

/// Named deployment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Environment {
    /// The default deployment.
    #[default]
    Default,
    /// A local deployment listening on port 4000.
    #[serde(rename = "LOCALHOST4000")]
    Localhost4000,
}

impl Environment {
    /// Returns the base URL of this environment.
    pub fn url(&self) -> &'static str {
        match self {
            Environment::Default => "http://localhost:3000/v1",
            Environment::Localhost4000 => "http://localhost:4000/v1",
        }
    }

    /// Returns the environment whose base URL is `url`, if any.
    pub fn from_url(url: &str) -> Option<Self> {
        let url = url.trim_end_matches('/');
        [Environment::Default, Environment::Localhost4000]
            .into_iter()
            .find(|env| env.url() == url)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Default => f.write_str("DEFAULT"),
            Environment::Localhost4000 => f.write_str("LOCALHOST4000"),
        }
    }
}

impl FromStr for Environment {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEFAULT" => Ok(Environment::Default),
            "LOCALHOST4000" => Ok(Environment::Localhost4000),
            other => Err(SdkError::configuration(format!("Unknown environment '{}'", other))),
        }
    }
}

/// Retry policy.
///
/// `attempts` counts the first attempt, so `1` means no retry. Zero behaves
/// like one: a single attempt without pause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    #[serde(default)]
    pub attempts: u32,
    /// Fixed delay between attempts in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,
}

impl RetryConfig {
    /// Creates a retry policy.
    pub fn new(attempts: u32, delay_ms: u64) -> Self {
        Self { attempts, delay_ms }
    }

    /// Creates a policy that performs a single attempt.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns the attempt budget, never less than one.
    pub fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Returns the pause between attempts.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Response validation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Whether decoded response models are validated.
    pub response_validation: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            response_validation: true,
        }
    }
}

/// A partially specified configuration record.
///
/// Used at every precedence level. `None` means "not set at this level",
/// which is distinct from a field explicitly set to zero or `false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Base URL for API requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Named environment; informs the base URL when `base_url` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    /// Request timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Retry policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
    /// Response validation settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationConfig>,
}

impl SdkConfig {
    /// Creates an empty configuration record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the environment.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Sets the timeout in milliseconds.
    pub fn timeout_ms(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the retry policy.
    pub fn retry(mut self, attempts: u32, delay_ms: u64) -> Self {
        self.retry = Some(RetryConfig::new(attempts, delay_ms));
        self
    }

    /// Enables or disables response validation.
    pub fn response_validation(mut self, enabled: bool) -> Self {
        self.validation = Some(ValidationConfig {
            response_validation: enabled,
        });
        self
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self == &SdkConfig::default()
    }

    /// The base URL this level contributes.
    ///
    /// An explicit `base_url` wins over an environment set at the same
    /// level; an environment alone contributes its URL.
    fn target_url(&self) -> Option<String> {
        self.base_url
            .clone()
            .or_else(|| self.environment.map(|env| env.url().to_string()))
    }

    /// Reads a configuration record from `USER_PERMISSIONS_API_*` variables.
    ///
    /// # Environment Variables
    ///
    /// - `USER_PERMISSIONS_API_BASE_URL`: base URL
    /// - `USER_PERMISSIONS_API_ENVIRONMENT`: `DEFAULT` or `LOCALHOST4000`
    /// - `USER_PERMISSIONS_API_TIMEOUT_MS`: timeout in milliseconds
    /// - `USER_PERMISSIONS_API_RETRY_ATTEMPTS`: attempt budget
    /// - `USER_PERMISSIONS_API_RETRY_DELAY_MS`: delay between attempts
    /// - `USER_PERMISSIONS_API_RESPONSE_VALIDATION`: `true` or `false`
    pub fn from_env() -> SdkResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration record from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> SdkResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{}_{}", ENV_PREFIX, suffix));
        let mut config = SdkConfig::new();

        if let Some(base_url) = var("BASE_URL") {
            validate_base_url(&base_url)?;
            config.base_url = Some(base_url);
        }
        if let Some(environment) = var("ENVIRONMENT") {
            config.environment = Some(environment.parse()?);
        }
        if let Some(timeout) = var("TIMEOUT_MS") {
            config.timeout = Some(parse_var("TIMEOUT_MS", &timeout)?);
        }

        let attempts = var("RETRY_ATTEMPTS")
            .map(|v| parse_var::<u32>("RETRY_ATTEMPTS", &v))
            .transpose()?;
        let delay_ms = var("RETRY_DELAY_MS")
            .map(|v| parse_var::<u64>("RETRY_DELAY_MS", &v))
            .transpose()?;
        if attempts.is_some() || delay_ms.is_some() {
            config.retry = Some(RetryConfig::new(
                attempts.unwrap_or_default(),
                delay_ms.unwrap_or_default(),
            ));
        }

        if let Some(enabled) = var("RESPONSE_VALIDATION") {
            config.validation = Some(ValidationConfig {
                response_validation: parse_var("RESPONSE_VALIDATION", &enabled)?,
            });
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> SdkResult<T> {
    value.trim().parse().map_err(|_| {
        SdkError::configuration(format!("{}_{} has an invalid value '{}'", ENV_PREFIX, name, value))
    })
}

/// Checks that a base URL is an absolute http(s) URL.
pub fn validate_base_url(base_url: &str) -> SdkResult<()> {
    let parsed = url::Url::parse(base_url)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(SdkError::configuration(format!(
            "Base URL must use http or https, got '{}'",
            scheme
        ))),
    }
}

/// The configuration in force for one call.
///
/// Fields not set at any level stay `None`; the accessors apply the
/// hard-coded defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveConfig {
    /// Resolved base URL.
    pub base_url: Option<String>,
    /// Resolved environment.
    pub environment: Option<Environment>,
    /// Resolved timeout in milliseconds.
    pub timeout: Option<u64>,
    /// Resolved retry policy.
    pub retry: Option<RetryConfig>,
    /// Resolved validation settings.
    pub validation: Option<ValidationConfig>,
}

impl EffectiveConfig {
    /// Base URL for the call: resolved base URL, then the default environment.
    pub fn url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| Environment::Default.url())
            .trim_end_matches('/')
    }

    /// Timeout for each attempt.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Retry policy, disabled when unset.
    pub fn retry(&self) -> RetryConfig {
        self.retry.unwrap_or_default()
    }

    /// Whether decoded responses are validated.
    pub fn response_validation(&self) -> bool {
        self.validation.unwrap_or_default().response_validation
    }
}

/// Merges configuration levels into an [`EffectiveConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigResolver;

impl ConfigResolver {
    /// Resolves levels ordered from lowest to highest precedence.
    ///
    /// For every field the value from the highest level that sets it wins.
    /// Absent levels are skipped; an empty input yields an empty result.
    /// `base_url` and `environment` travel together: a level that names an
    /// environment without a base URL contributes that environment's URL.
    pub fn resolve<'a, I>(levels: I) -> EffectiveConfig
    where
        I: IntoIterator<Item = Option<&'a SdkConfig>>,
    {
        levels
            .into_iter()
            .flatten()
            .fold(EffectiveConfig::default(), |mut resolved, level| {
                if let Some(url) = level.target_url() {
                    resolved.base_url = Some(url);
                    resolved.environment = level
                        .environment
                        .or_else(|| level.base_url.as_deref().and_then(Environment::from_url));
                }
                if level.timeout.is_some() {
                    resolved.timeout = level.timeout;
                }
                if level.retry.is_some() {
                    resolved.retry = level.retry;
                }
                if level.validation.is_some() {
                    resolved.validation = level.validation;
                }
                resolved
            })
    }

    /// Resolves the four named levels.
    pub fn resolve_levels(
        sdk: Option<&SdkConfig>,
        service: Option<&SdkConfig>,
        method: Option<&SdkConfig>,
        request: Option<&SdkConfig>,
    ) -> EffectiveConfig {
        Self::resolve([sdk, service, method, request])
    }
}
