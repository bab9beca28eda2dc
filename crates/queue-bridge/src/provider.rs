//! Provider types and configuration.
//!
//! Each provider has its own immutable configuration struct. [`QueueConfig`] is
//! the provider-tagged union the factory dispatches on; it is normally loaded
//! once at startup with [`QueueConfig::load`] and then shared by reference.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Longest visibility timeout SQS accepts (12 hours)
pub const MAX_VISIBILITY_TIMEOUT_SECONDS: u64 = 12 * 60 * 60;

/// Largest receive batch SQS accepts
pub const MAX_RECEIVE_BATCH: u32 = 10;

/// Enumeration of supported queue providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Sqs,
    Sns,
    InMemory,
}

impl ProviderType {
    /// Provider tag as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqs => "sqs",
            Self::Sns => "sns",
            Self::InMemory => "in_memory",
        }
    }

    /// Check if provider accepts message attributes on send
    pub fn supports_attributes(&self) -> bool {
        match self {
            Self::Sqs => true,
            Self::Sns => true,
            Self::InMemory => true,
        }
    }

    /// Check if messages can be consumed directly from the provider
    pub fn supports_consumption(&self) -> bool {
        self.consumption_unsupported_reason().is_none()
    }

    /// Explanation for providers that cannot be consumed from
    pub fn consumption_unsupported_reason(&self) -> Option<&'static str> {
        match self {
            Self::Sns => Some("SNS does not support consuming messages. Use subscriptions instead."),
            Self::Sqs | Self::InMemory => None,
        }
    }

    /// Get maximum message size for provider
    pub fn max_message_size(&self) -> usize {
        match self {
            Self::Sqs => 256 * 1024,          // 256KB
            Self::Sns => 256 * 1024,          // 256KB
            Self::InMemory => 10 * 1024 * 1024, // 10MB
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqs" => Ok(Self::Sqs),
            "sns" => Ok(Self::Sns),
            "in_memory" | "in-memory" | "memory" => Ok(Self::InMemory),
            _ => Err(ConfigurationError::UnknownProvider {
                provider: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Heartbeat Configuration
// ============================================================================

/// Visibility heartbeat settings for consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Seconds between visibility extensions; 0 disables heartbeats
    #[serde(default)]
    pub heartbeat_interval_seconds: u64,
    /// Maximum number of renewals running at the same time
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
}

fn default_worker_pool_size() -> usize {
    4
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_seconds: 0,
            worker_pool_size: default_worker_pool_size(),
        }
    }
}

impl HeartbeatConfig {
    /// Create heartbeat configuration with an interval
    pub fn new(heartbeat_interval_seconds: u64, worker_pool_size: usize) -> Self {
        Self {
            heartbeat_interval_seconds,
            worker_pool_size,
        }
    }

    /// Heartbeat configuration with renewals turned off
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.heartbeat_interval_seconds > 0
    }

    /// Period between renewal ticks
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    /// Visibility window requested on every renewal.
    ///
    /// Twice the interval, so one missed tick does not expose the message.
    pub fn visibility_extension_seconds(&self) -> u64 {
        self.heartbeat_interval_seconds.saturating_mul(2)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.is_enabled() {
            return Ok(());
        }

        if self.worker_pool_size == 0 {
            return Err(ConfigurationError::Invalid {
                message: "heartbeat.worker_pool_size must be at least 1".to_string(),
            });
        }

        if self.visibility_extension_seconds() > MAX_VISIBILITY_TIMEOUT_SECONDS {
            return Err(ConfigurationError::Invalid {
                message: format!(
                    "heartbeat.heartbeat_interval_seconds must be at most {}",
                    MAX_VISIBILITY_TIMEOUT_SECONDS / 2
                ),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// AWS SQS configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqsConfig {
    pub queue_url: String,
    pub region: String,
    /// Endpoint override (LocalStack, ElasticMQ); empty means the AWS default
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Messages requested per receive (1-10)
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

fn default_max_messages() -> u32 {
    MAX_RECEIVE_BATCH
}

impl SqsConfig {
    pub fn new(queue_url: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            region: region.into(),
            endpoint: None,
            max_messages: default_max_messages(),
            heartbeat: HeartbeatConfig::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_max_messages(mut self, max_messages: u32) -> Self {
        self.max_messages = max_messages;
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Endpoint override, ignoring empty strings
    pub fn endpoint_override(&self) -> Option<&str> {
        non_empty(self.endpoint.as_deref())
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require("queue_url", &self.queue_url)?;
        require("region", &self.region)?;

        if self.max_messages == 0 || self.max_messages > MAX_RECEIVE_BATCH {
            return Err(ConfigurationError::Invalid {
                message: format!("max_messages must be between 1 and {}", MAX_RECEIVE_BATCH),
            });
        }

        self.heartbeat.validate()
    }
}

/// AWS SNS configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnsConfig {
    pub topic_arn: String,
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl SnsConfig {
    pub fn new(topic_arn: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            topic_arn: topic_arn.into(),
            region: region.into(),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Endpoint override, ignoring empty strings
    pub fn endpoint_override(&self) -> Option<&str> {
        non_empty(self.endpoint.as_deref())
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require("topic_arn", &self.topic_arn)?;
        require("region", &self.region)
    }
}

/// In-memory provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryConfig {
    /// Queues with the same name share messages within one factory
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,
    /// Seconds a received message stays invisible before redelivery
    #[serde(default = "default_visibility_timeout_seconds")]
    pub visibility_timeout_seconds: u64,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

fn default_queue_name() -> String {
    "default".to_string()
}

fn default_visibility_timeout_seconds() -> u64 {
    30
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            queue_name: default_queue_name(),
            max_messages: default_max_messages(),
            visibility_timeout_seconds: default_visibility_timeout_seconds(),
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

impl InMemoryConfig {
    pub fn with_queue_name(mut self, queue_name: impl Into<String>) -> Self {
        self.queue_name = queue_name.into();
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn with_visibility_timeout(mut self, seconds: u64) -> Self {
        self.visibility_timeout_seconds = seconds;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require("queue_name", &self.queue_name)?;

        if self.max_messages == 0 {
            return Err(ConfigurationError::Invalid {
                message: "max_messages must be at least 1".to_string(),
            });
        }

        self.heartbeat.validate()
    }
}

// ============================================================================
// Queue Configuration
// ============================================================================

/// Provider-tagged configuration consumed by the factory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum QueueConfig {
    Sqs(SqsConfig),
    Sns(SnsConfig),
    InMemory(InMemoryConfig),
}

impl QueueConfig {
    /// Get the declared provider
    pub fn provider(&self) -> ProviderType {
        match self {
            Self::Sqs(_) => ProviderType::Sqs,
            Self::Sns(_) => ProviderType::Sns,
            Self::InMemory(_) => ProviderType::InMemory,
        }
    }

    /// Heartbeat settings, for providers that can be consumed from
    pub fn heartbeat(&self) -> Option<&HeartbeatConfig> {
        match self {
            Self::Sqs(config) => Some(&config.heartbeat),
            Self::Sns(_) => None,
            Self::InMemory(config) => Some(&config.heartbeat),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::Sqs(config) => config.validate(),
            Self::Sns(config) => config.validate(),
            Self::InMemory(config) => config.validate(),
        }
    }

    /// Build configuration from resolved settings.
    ///
    /// The `provider` key is parsed first so an unknown tag is reported as
    /// such rather than as a generic deserialization failure.
    pub fn from_settings(settings: &config::Config) -> Result<Self, ConfigurationError> {
        let tag = settings
            .get_string("provider")
            .map_err(|_| ConfigurationError::Missing {
                key: "provider".to_string(),
            })?;
        let provider: ProviderType = tag.parse()?;

        let parsed = match provider {
            ProviderType::Sqs => settings.clone().try_deserialize().map(Self::Sqs),
            ProviderType::Sns => settings.clone().try_deserialize().map(Self::Sns),
            ProviderType::InMemory => settings.clone().try_deserialize().map(Self::InMemory),
        }
        .map_err(|e| ConfigurationError::Parsing {
            message: e.to_string(),
        })?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Load configuration from an optional file and the environment.
    ///
    /// Environment variables use `env_prefix` and a double-underscore
    /// separator, e.g. `QUEUE_BRIDGE__HEARTBEAT__HEARTBEAT_INTERVAL_SECONDS=5`.
    /// Environment values override the file.
    pub fn load(path: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::Parsing {
                message: e.to_string(),
            })?;

        Self::from_settings(&settings)
    }
}

fn require(key: &str, value: &str) -> Result<(), ConfigurationError> {
    if value.trim().is_empty() {
        return Err(ConfigurationError::Missing {
            key: key.to_string(),
        });
    }
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
