//! Logging for the Vellum gateway
//!
//! Libraries in this workspace only emit `tracing` events and spans. The
//! `vellum` binary calls [`install`] once at startup with the `[logging]`
//! section of its config:
//!
//! - diagnostics go to stderr as text or JSON lines, filtered by `level`
//!   or `RUST_LOG`
//! - events with target [`AUDIT_TARGET`] (one per saved version) can also
//!   be appended to rotated JSONL files, regardless of the diagnostics level
//!
//! ```ignore
//! let _guard = vellum_logging::install(&settings.logging)?;
//! ```

pub mod config;
pub mod correlation;
pub mod layers;

pub use config::{AuditLogConfig, LogConfig, LogFormat, Rotation};
pub use correlation::{CorrelationExt, Operation, RequestCorrelation};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{Registry, layer::SubscriberExt, util::SubscriberInitExt};

use layers::BoxedLayer;

/// Target of the audit events written for every saved version
pub const AUDIT_TARGET: &str = "vellum::audit";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Audit log error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rolling appender error: {0}")]
    Appender(String),

    #[error("Subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Keeps the audit writer alive; dropping it flushes pending lines
#[must_use = "dropping the guard stops audit output"]
pub struct LogGuard {
    audit: Option<WorkerGuard>,
}

impl LogGuard {
    pub fn has_audit_file(&self) -> bool {
        self.audit.is_some()
    }
}

/// Install the global subscriber described by `config`
pub fn install(config: &LogConfig) -> Result<LogGuard, LoggingError> {
    let mut outputs: Vec<BoxedLayer<Registry>> = vec![layers::stderr_layer(config.format, &config.level)];

    let mut audit = None;
    if let Some(audit_config) = &config.audit {
        let (layer, guard) = layers::audit_layer(audit_config)?;
        outputs.push(layer);
        audit = Some(guard);
    }

    tracing_subscriber::registry()
        .with(outputs)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))?;

    Ok(LogGuard { audit })
}
