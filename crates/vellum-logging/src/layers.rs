//! Output layers: diagnostics on stderr, audit events to a file

use std::fs::{self, OpenOptions};

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::filter::{EnvFilter, filter_fn};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::config::{AuditLogConfig, LogFormat, Rotation};
use crate::{AUDIT_TARGET, LoggingError};

pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

const AUDIT_PREFIX: &str = "audit";

/// Diagnostics to stderr, filtered by `RUST_LOG` or `level`
pub fn stderr_layer<S>(format: LogFormat, level: &str) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let base = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match format {
        LogFormat::Text => base.with_target(false).with_filter(filter).boxed(),
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_filter(filter)
            .boxed(),
    }
}

/// JSONL layer that only writes [`AUDIT_TARGET`] events, whatever the level filter
///
/// Spans pass the filter so each audit line carries its request's span fields.
pub fn audit_layer<S>(config: &AuditLogConfig) -> Result<(BoxedLayer<S>, WorkerGuard), LoggingError>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fs::create_dir_all(&config.directory)?;

    let (writer, guard) = match config.rotation {
        Rotation::Never => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(config.directory.join(format!("{AUDIT_PREFIX}.log")))?;
            tracing_appender::non_blocking(file)
        }
        Rotation::Daily | Rotation::Hourly => {
            let rotation = if config.rotation == Rotation::Hourly {
                rolling::Rotation::HOURLY
            } else {
                rolling::Rotation::DAILY
            };
            let mut builder = RollingFileAppender::builder()
                .rotation(rotation)
                .filename_prefix(AUDIT_PREFIX)
                .filename_suffix("log");
            if let Some(max_files) = config.max_files {
                builder = builder.max_log_files(max_files);
            }
            let appender = builder
                .build(&config.directory)
                .map_err(|e| LoggingError::Appender(e.to_string()))?;
            tracing_appender::non_blocking(appender)
        }
    };

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_writer(writer)
        .with_filter(filter_fn(|meta| meta.is_span() || meta.target() == AUDIT_TARGET))
        .boxed();
    Ok((layer, guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracing_subscriber::Registry;

    #[test]
    fn test_single_file_audit_is_created() {
        let temp = TempDir::new().unwrap();
        let config = AuditLogConfig {
            directory: temp.path().join("nested"),
            rotation: Rotation::Never,
            max_files: None,
        };

        let (_layer, _guard) = audit_layer::<Registry>(&config).unwrap();
        assert!(temp.path().join("nested").join("audit.log").exists());
    }

    #[test]
    fn test_rolling_audit_builds() {
        let temp = TempDir::new().unwrap();
        let config = AuditLogConfig {
            directory: temp.path().to_path_buf(),
            rotation: Rotation::Hourly,
            max_files: Some(3),
        };
        assert!(audit_layer::<Registry>(&config).is_ok());
    }
}
