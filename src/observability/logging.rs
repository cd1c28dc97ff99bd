//! Logging configuration.
//!
//! The client only emits `tracing` events. Applications that want them on
//! stdout can install a subscriber with [`LoggingConfig::init`].

use std::str::FromStr;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ENV_PREFIX;
use crate::errors::{SdkError, SdkResult};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// The minimum level to capture.
    pub level: LogLevel,
    /// The output format.
    pub format: LogFormat,
    /// Whether to include timestamps.
    pub include_timestamps: bool,
    /// Whether to include the module target.
    pub include_target: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Request and response details.
    Debug,
    /// Retry decisions.
    Info,
    /// Failed calls.
    Warn,
    /// Errors only.
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(SdkError::configuration(format!("Unknown log level '{}'", other))),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable with colors.
    Pretty,
    /// One JSON object per event.
    Json,
    /// Single-line.
    Compact,
}

impl FromStr for LogFormat {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(SdkError::configuration(format!("Unknown log format '{}'", other))),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            include_timestamps: true,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `USER_PERMISSIONS_API_LOG_LEVEL` and `USER_PERMISSIONS_API_LOG_FORMAT`.
    pub fn from_env() -> SdkResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`LoggingConfig::from_env`] with a custom variable lookup.
    pub fn from_lookup<F>(lookup: F) -> SdkResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(level) = lookup(&format!("{}_LOG_LEVEL", ENV_PREFIX)) {
            config.level = level.parse()?;
        }
        if let Some(format) = lookup(&format!("{}_LOG_FORMAT", ENV_PREFIX)) {
            config.format = format.parse()?;
        }
        Ok(config)
    }

    /// Sets the log level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the log format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets whether to include timestamps.
    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamps = include;
        self
    }

    /// Sets whether to include the module target.
    pub fn with_target(mut self, include: bool) -> Self {
        self.include_target = include;
        self
    }

    /// Installs a global subscriber. Call once at application startup.
    ///
    /// `RUST_LOG` directives are honored on top of the configured level.
    ///
    /// # Errors
    ///
    /// Fails if a global subscriber is already installed.
    pub fn init(self) -> SdkResult<()> {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::from(self.level).into())
            .from_env_lossy();
        let registry = tracing_subscriber::registry().with(filter);

        let result = match (self.format, self.include_timestamps) {
            (LogFormat::Pretty, true) => registry
                .with(fmt::layer().with_target(self.include_target))
                .try_init(),
            (LogFormat::Pretty, false) => registry
                .with(fmt::layer().with_target(self.include_target).without_time())
                .try_init(),
            (LogFormat::Json, true) => registry
                .with(fmt::layer().json().with_target(self.include_target))
                .try_init(),
            (LogFormat::Json, false) => registry
                .with(fmt::layer().json().with_target(self.include_target).without_time())
                .try_init(),
            (LogFormat::Compact, true) => registry
                .with(fmt::layer().compact().with_target(self.include_target))
                .try_init(),
            (LogFormat::Compact, false) => registry
                .with(fmt::layer().compact().with_target(self.include_target).without_time())
                .try_init(),
        };

        result.map_err(|e| SdkError::configuration(format!("Logging already initialized: {}", e)))
    }
}
