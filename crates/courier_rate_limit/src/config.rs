//! Configuration structures for rate limiting and dispatch.
//!
//! This module provides TOML-based configuration. The configuration system supports:
//! - Bundled defaults (include_str! from courier.toml)
//! - User overrides (~/.config/courier/courier.toml, then ./courier.toml)
//! - Automatic merging with user values taking precedence

use crate::Tier;
use courier_error::{ConfigError, CourierError, CourierResult};
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Method-specific rate limit overrides.
///
/// Only specified fields override the tier defaults.
///
/// ```toml
/// [platforms.telegram.tiers.group.methods.sendPhoto]
/// rpm = 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct MethodTierConfig {
    /// Requests per second limit (overrides tier default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rps: Option<u32>,

    /// Requests per minute limit (overrides tier default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm: Option<u32>,

    /// Requests per day limit (overrides tier default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpd: Option<u32>,

    /// Maximum concurrent requests (overrides tier default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent: Option<u32>,
}

/// Configuration for a specific platform tier.
///
/// ```toml
/// [platforms.graph.tiers.standard]
/// name = "Standard"
/// rps = 20
/// rpm = 600
/// max_concurrent = 4
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TierConfig {
    /// Name of the tier
    pub name: String,

    /// Requests per second limit
    #[serde(default)]
    pub rps: Option<u32>,

    /// Requests per minute limit
    #[serde(default)]
    pub rpm: Option<u32>,

    /// Requests per day limit
    #[serde(default)]
    pub rpd: Option<u32>,

    /// Maximum concurrent requests
    #[serde(default)]
    pub max_concurrent: Option<u32>,

    /// Method-specific overrides, keyed by API method or endpoint name
    #[serde(default)]
    pub methods: HashMap<String, MethodTierConfig>,
}

impl Tier for TierConfig {
    fn rps(&self) -> Option<u32> {
        self.rps
    }

    fn rpm(&self) -> Option<u32> {
        self.rpm
    }

    fn rpd(&self) -> Option<u32> {
        self.rpd
    }

    fn max_concurrent(&self) -> Option<u32> {
        self.max_concurrent
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TierConfig {
    /// Get the tier configuration with method-specific overrides applied.
    ///
    /// Method names match case-insensitively.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use courier_rate_limit::{CourierConfig, Tier};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = CourierConfig::load()?;
    /// let tier = config.get_tier("telegram", Some("group")).unwrap();
    /// println!("sendPhoto RPM: {:?}", tier.for_method("sendPhoto").rpm());
    /// # Ok(())
    /// # }
    /// ```
    pub fn for_method(&self, method: &str) -> TierConfig {
        let overrides = self.methods.get(method).or_else(|| {
            self.methods
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(method))
                .map(|(_, config)| config)
        });

        match overrides {
            Some(method_config) => TierConfig {
                name: self.name.clone(),
                rps: method_config.rps.or(self.rps),
                rpm: method_config.rpm.or(self.rpm),
                rpd: method_config.rpd.or(self.rpd),
                max_concurrent: method_config.max_concurrent.or(self.max_concurrent),
                methods: HashMap::new(),
            },
            None => self.clone(),
        }
    }
}

/// Configuration for a specific platform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlatformConfig {
    /// Name of the default tier for this platform
    pub default_tier: String,

    /// Base URL job requests are relative to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Map of tier name to tier configuration
    #[serde(default)]
    pub tiers: HashMap<String, TierConfig>,
}

/// Dispatch engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// Maximum number of jobs handed to a worker in one call
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Attempts for a batch whose every job failed with a retryable error
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,

    /// Upper bound of the retry delay, in milliseconds
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_max_batch_size() -> usize {
    50
}

fn default_retry_attempts() -> usize {
    3
}

fn default_retry_initial_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    30_000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            retry_attempts: default_retry_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

/// Top-level courier configuration.
///
/// Loads configuration from TOML files with a precedence system:
/// 1. Bundled defaults (include_str! from courier.toml)
/// 2. User override (~/.config/courier/courier.toml, then ./courier.toml)
///
/// # Example
///
/// ```no_run
/// use courier_rate_limit::CourierConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CourierConfig::load()?;
/// let tier = config.get_tier("graph", None).unwrap();
/// println!("Graph RPM: {:?}", tier.rpm);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct CourierConfig {
    /// Map of platform name to platform configuration
    #[serde(default)]
    pub platforms: HashMap<String, PlatformConfig>,

    /// Dispatch engine settings
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl CourierConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> CourierResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                CourierError::from(
                    ConfigError::new(format!("Failed to read configuration: {}", e))
                        .with_path(path.as_ref()),
                )
            })?
            .try_deserialize()
            .map_err(|e| {
                CourierError::from(
                    ConfigError::new(format!("Failed to parse configuration: {}", e))
                        .with_path(path.as_ref()),
                )
            })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid configuration.
    pub fn from_toml_str(toml: &str) -> CourierResult<Self> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| {
                CourierError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Load configuration with precedence: current dir > home dir > bundled default.
    ///
    /// User config files are optional and silently skipped if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if any present source fails to parse.
    #[instrument]
    pub fn load() -> CourierResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../courier.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/courier/courier.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("courier").required(false));

        builder
            .build()
            .map_err(|e| {
                CourierError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                CourierError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Get tier configuration for a platform.
    ///
    /// Uses the platform's default tier when `tier_name` is `None`.
    #[instrument(skip(self))]
    pub fn get_tier(&self, platform: &str, tier_name: Option<&str>) -> Option<TierConfig> {
        let platform_config = self.platforms.get(platform)?;

        let tier = tier_name.unwrap_or(&platform_config.default_tier);

        debug!(platform, tier, "Looking up tier configuration");

        platform_config.tiers.get(tier).cloned()
    }

    /// API base URL of a platform, if configured.
    pub fn api_base(&self, platform: &str) -> Option<&str> {
        self.platforms.get(platform)?.api_base.as_deref()
    }
}
