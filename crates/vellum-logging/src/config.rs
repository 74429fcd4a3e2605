//! The `[logging]` section of `vellum.toml`

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How diagnostics are written and where the save audit trail goes
///
/// Diagnostics always go to stderr so stdout stays free for command output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter for diagnostics, e.g. `warn` or `vellum_gateway=debug`;
    /// `RUST_LOG` takes precedence
    pub level: String,
    pub format: LogFormat,
    /// Persist audit events to rotated JSONL files
    pub audit: Option<AuditLogConfig>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
            audit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line, with span fields such as `request_id`
    Json,
}

/// Destination of the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditLogConfig {
    pub directory: PathBuf,
    pub rotation: Rotation,
    /// Rotated files to keep; all when unset
    pub max_files: Option<usize>,
}

impl Default for AuditLogConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./audit"),
            rotation: Rotation::Daily,
            max_files: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Daily,
    Hourly,
    /// A single `audit.log`, appended to across runs
    Never,
}
