//! Configuration types for cfddns
//!
//! Configuration is read from a TOML document:
//!
//! ```toml
//! [global]
//! hostnames = ["home.example.com", "vpn.example.com"]
//!
//! [cloudflare]
//! email = "ops@example.com"
//! api_key = "..."
//!
//! [schedule]
//! min_interval_secs = 240
//! max_interval_secs = 360
//!
//! [engine]
//! record_ttl = 300
//! request_timeout_secs = 30
//! ```
//!
//! Only `[global]` and `[cloudflare]` are required.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Smallest TTL cfddns will write
pub const MIN_RECORD_TTL: u32 = 60;

/// Largest TTL cfddns will write
pub const MAX_RECORD_TTL: u32 = 300;

/// Longest sleep allowed between cycles (one day)
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// Main cfddns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfddnsConfig {
    /// Hostnames to manage
    pub global: GlobalConfig,

    /// Cloudflare credentials
    pub cloudflare: Credentials,

    /// Polling interval bounds
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Synchronizer settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Log at debug level
    #[serde(default)]
    pub verbose: bool,
}

impl CfddnsConfig {
    /// Build a configuration with default schedule and engine settings
    pub fn new(hostnames: Vec<String>, credentials: Credentials) -> Self {
        Self {
            global: GlobalConfig { hostnames },
            cloudflare: credentials,
            schedule: ScheduleConfig::default(),
            engine: EngineConfig::default(),
            verbose: false,
        }
    }

    /// Parse a TOML document
    ///
    /// The result is not validated; call [`CfddnsConfig::validate`].
    pub fn from_toml_str(contents: &str) -> Result<Self, crate::Error> {
        Ok(toml::from_str(contents)?)
    }

    /// Read and parse a TOML config file without validating it
    ///
    /// Lets callers layer overrides on top before calling
    /// [`CfddnsConfig::validate`].
    pub fn read(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Read, parse and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.global.validate()?;
        self.cloudflare.validate()?;
        self.schedule.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// The `[global]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Fully-qualified hostnames whose A records are managed
    pub hostnames: Vec<String>,
}

impl GlobalConfig {
    /// Validate the hostname list
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.hostnames.is_empty() {
            return Err(crate::Error::config("No hostnames configured"));
        }

        let mut seen = HashSet::new();
        for hostname in &self.hostnames {
            validate_hostname(hostname)?;
            if !seen.insert(hostname.to_ascii_lowercase()) {
                return Err(crate::Error::config(format!(
                    "Hostname listed more than once: {}",
                    hostname
                )));
            }
        }

        Ok(())
    }
}

/// Provider credentials
///
/// With an `email`, `api_key` is treated as a legacy global API key.
/// Without one it is sent as a scoped API token.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email (identity)
    #[serde(default)]
    pub email: Option<String>,

    /// API key or token (secret), may be supplied by the environment instead
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub api_key: String,
}

impl Credentials {
    /// Create credentials for a scoped API token
    pub fn token(api_key: impl Into<String>) -> Self {
        Self {
            email: None,
            api_key: api_key.into(),
        }
    }

    /// Create credentials for a global API key bound to an account email
    pub fn global_key(email: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            api_key: api_key.into(),
        }
    }

    /// Validate the credentials
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_key.trim().is_empty() {
            return Err(crate::Error::config("Cloudflare api_key cannot be empty"));
        }
        if let Some(email) = &self.email
            && !email.contains('@')
        {
            return Err(crate::Error::config(format!(
                "Cloudflare email is not an address: {}",
                email
            )));
        }
        Ok(())
    }
}

// Custom Debug implementation that hides the API key
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

/// Polling schedule
///
/// Each sleep between cycles is drawn uniformly from
/// `min_interval_secs..=max_interval_secs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Shortest sleep between cycles (in seconds)
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,

    /// Longest sleep between cycles (in seconds)
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,
}

impl ScheduleConfig {
    /// Validate the interval bounds
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.min_interval_secs == 0 {
            return Err(crate::Error::config("min_interval_secs must be > 0"));
        }
        if self.min_interval_secs > self.max_interval_secs {
            return Err(crate::Error::config(format!(
                "min_interval_secs ({}) must not exceed max_interval_secs ({})",
                self.min_interval_secs, self.max_interval_secs
            )));
        }
        if self.max_interval_secs > MAX_INTERVAL_SECS {
            return Err(crate::Error::config(format!(
                "max_interval_secs must be at most {} seconds. Got: {}",
                MAX_INTERVAL_SECS, self.max_interval_secs
            )));
        }
        Ok(())
    }

    /// Shortest sleep as a Duration
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    /// Longest sleep as a Duration
    pub fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: default_min_interval_secs(),
            max_interval_secs: default_max_interval_secs(),
        }
    }
}

/// Synchronizer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// TTL for newly created records (in seconds)
    #[serde(default = "default_record_ttl")]
    pub record_ttl: u32,

    /// Upper bound on any single provider call (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl EngineConfig {
    /// Validate engine settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(MIN_RECORD_TTL..=MAX_RECORD_TTL).contains(&self.record_ttl) {
            return Err(crate::Error::config(format!(
                "record_ttl must be between {} and {} seconds. Got: {}",
                MIN_RECORD_TTL, MAX_RECORD_TTL, self.record_ttl
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("request_timeout_secs must be > 0"));
        }
        Ok(())
    }

    /// Request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            record_ttl: default_record_ttl(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_min_interval_secs() -> u64 {
    240
}

fn default_max_interval_secs() -> u64 {
    360
}

fn default_record_ttl() -> u32 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Validate that a string is a fully-qualified hostname with a parent domain
///
/// Basic RFC 1035 checks. The name needs at least two labels so that
/// stripping the leftmost one leaves a domain.
pub fn validate_hostname(hostname: &str) -> Result<(), crate::Error> {
    if hostname.is_empty() {
        return Err(crate::Error::config("Hostname cannot be empty"));
    }

    // RFC 1035: 253 chars max
    if hostname.len() > 253 {
        return Err(crate::Error::config(format!(
            "Hostname too long: {} chars (max 253). Got: {}",
            hostname.len(),
            hostname
        )));
    }

    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() < 2 {
        return Err(crate::Error::config(format!(
            "Hostname has no parent domain: {}",
            hostname
        )));
    }

    for label in labels {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Hostname has empty label: '{}'",
                hostname
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Hostname label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "Hostname label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Hostname label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}
