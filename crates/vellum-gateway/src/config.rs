//! Gateway configuration
//!
//! Loaded from TOML. Every section is optional and falls back to the
//! documented defaults:
//!
//! ```toml
//! categories = ["ActiGraph", "GENEActiv", "Axivity", "ActiSleep", "Other"]
//! request_deadline_ms = 60000
//!
//! [artifacts]
//! editable = "part4_nightsummary_sleep_cleaned.csv"
//! documents = ["visualisation_sleep.pdf", "visualisation_data.pdf"]
//!
//! [allowlist]
//! refresh_interval_secs = 300
//! staleness_threshold_secs = 900
//! fetch_timeout_ms = 10000
//!
//! [store]
//! call_timeout_ms = 15000
//! read_retries = 3
//! retry_base_delay_ms = 200
//! conflict_retries = 8
//! conflict_backoff_ms = 25
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use vellum_core::ArtifactNames;

use crate::resolver::CategorySet;
use crate::retry::RetryPolicy;

/// Categories offered when none are configured
pub const DEFAULT_CATEGORIES: [&str; 5] = ["ActiGraph", "GENEActiv", "Axivity", "ActiSleep", "Other"];

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Top-level gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Categories a caller may select
    pub categories: Vec<String>,

    /// Overall budget for one search or save
    pub request_deadline_ms: u64,

    /// The well-known artifact names every results folder holds
    pub artifacts: ArtifactNames,

    /// Allowlist cache behavior
    pub allowlist: AllowlistConfig,

    /// Store call behavior
    pub store: StoreConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.map(String::from).to_vec(),
            request_deadline_ms: 60_000,
            artifacts: ArtifactNames::default(),
            allowlist: AllowlistConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Allowlist cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowlistConfig {
    /// Time between background refreshes
    pub refresh_interval_secs: u64,
    /// Age beyond which the last good snapshot is no longer trusted
    pub staleness_threshold_secs: u64,
    /// Budget for a single fetch from the source
    pub fetch_timeout_ms: u64,
}

impl Default for AllowlistConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 300,
            staleness_threshold_secs: 900,
            fetch_timeout_ms: 10_000,
        }
    }
}

impl AllowlistConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_secs(self.staleness_threshold_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// Object store call configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Budget for a single store call
    pub call_timeout_ms: u64,
    /// Retries after the first attempt for transient read failures
    pub read_retries: u32,
    /// First retry delay; doubles on each further retry
    pub retry_base_delay_ms: u64,
    /// Re-list-and-retry rounds after the first create collides
    pub conflict_retries: u32,
    /// Upper bound of the first jittered pause between conflict rounds
    pub conflict_backoff_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 15_000,
            read_retries: 3,
            retry_base_delay_ms: 200,
            conflict_retries: 8,
            conflict_backoff_ms: 25,
        }
    }
}

impl StoreConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn read_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.read_retries,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    pub fn conflict_backoff(&self) -> Duration {
        Duration::from_millis(self.conflict_backoff_ms)
    }
}

impl GatewayConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every setting, failing on the first problem
    pub fn validate(&self) -> Result<(), ConfigError> {
        CategorySet::new(self.categories.iter())
            .map_err(|e| ConfigError::invalid(format!("categories: {e}")))?;

        let names = self.artifacts.all();
        for name in names {
            if name.trim().is_empty() || name.contains(['/', '\\']) || name == "." || name == ".."
            {
                return Err(ConfigError::invalid(format!(
                    "artifact name {name:?} is not a plain file name"
                )));
            }
        }
        if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
            return Err(ConfigError::invalid("artifact names must be distinct"));
        }

        let positive = [
            ("allowlist.refresh_interval_secs", self.allowlist.refresh_interval_secs),
            ("allowlist.staleness_threshold_secs", self.allowlist.staleness_threshold_secs),
            ("allowlist.fetch_timeout_ms", self.allowlist.fetch_timeout_ms),
            ("store.call_timeout_ms", self.store.call_timeout_ms),
            ("request_deadline_ms", self.request_deadline_ms),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::invalid(format!("{key} must be greater than zero")));
            }
        }

        if self.allowlist.staleness_threshold_secs < self.allowlist.refresh_interval_secs {
            return Err(ConfigError::invalid(
                "allowlist.staleness_threshold_secs must not be shorter than the refresh interval",
            ));
        }

        Ok(())
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }

    /// Set the selectable categories
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Set the well-known artifact names
    pub fn with_artifact_names(mut self, names: ArtifactNames) -> Self {
        self.artifacts = names;
        self
    }

    /// Set the allowlist refresh interval
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.allowlist.refresh_interval_secs = interval.as_secs();
        self
    }

    /// Set the allowlist staleness threshold
    pub fn with_staleness_threshold(mut self, threshold: Duration) -> Self {
        self.allowlist.staleness_threshold_secs = threshold.as_secs();
        self
    }

    /// Set the per-fetch allowlist timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.allowlist.fetch_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the per-call store timeout
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.store.call_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the read retry policy
    pub fn with_read_retries(mut self, retries: u32, base_delay: Duration) -> Self {
        self.store.read_retries = retries;
        self.store.retry_base_delay_ms = base_delay.as_millis() as u64;
        self
    }

    /// Set the conflict retry bound and pause
    pub fn with_conflict_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.store.conflict_retries = retries;
        self.store.conflict_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// Set the overall request deadline
    pub fn with_request_deadline(mut self, deadline: Duration) -> Self {
        self.request_deadline_ms = deadline.as_millis() as u64;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.allowlist.refresh_interval(), Duration::from_secs(300));
        assert_eq!(config.allowlist.staleness_threshold(), Duration::from_secs(900));
        assert_eq!(config.store.read_retry_policy(), RetryPolicy::default());
        assert_eq!(config.request_deadline(), Duration::from_secs(60));
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = GatewayConfig::from_toml("").unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = GatewayConfig::from_toml(
            r#"
            categories = ["ActiGraph", "Lab-2"]

            [allowlist]
            refresh_interval_secs = 60

            [store]
            conflict_retries = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.categories, vec!["ActiGraph", "Lab-2"]);
        assert_eq!(config.allowlist.refresh_interval_secs, 60);
        assert_eq!(config.allowlist.staleness_threshold_secs, 900);
        assert_eq!(config.store.conflict_retries, 3);
        assert_eq!(config.store.read_retries, 3);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = GatewayConfig::default().with_conflict_retries(2, Duration::from_millis(5));
        let text = config.to_toml().unwrap();
        assert_eq!(GatewayConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_rejects_bad_categories() {
        for categories in [vec![], vec!["Philips Health Band"], vec!["A", "A"], vec!["../x"]] {
            let config = GatewayConfig::default().with_categories(categories.clone());
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "{categories:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_bad_artifact_names() {
        let same = ArtifactNames::new("a.pdf", ["a.pdf".into(), "b.pdf".into()]);
        assert!(GatewayConfig::default().with_artifact_names(same).validate().is_err());

        let nested = ArtifactNames::new("x/a.csv", ["a.pdf".into(), "b.pdf".into()]);
        assert!(GatewayConfig::default().with_artifact_names(nested).validate().is_err());
    }

    #[test]
    fn test_rejects_zero_and_inverted_durations() {
        let config = GatewayConfig::default().with_request_deadline(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = GatewayConfig::default()
            .with_refresh_interval(Duration::from_secs(600))
            .with_staleness_threshold(Duration::from_secs(60));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("vellum.toml");
        std::fs::write(&path, "request_deadline_ms = 5000\n").unwrap();
        let config = GatewayConfig::from_file(&path).unwrap();
        assert_eq!(config.request_deadline(), Duration::from_secs(5));

        assert!(matches!(
            GatewayConfig::from_file(&temp.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
