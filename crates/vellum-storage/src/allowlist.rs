//! Allowlist source implementations
//!
//! Sources return identifiers exactly as they appear upstream. Normalization
//! happens in the gateway's cache on ingest.

use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::debug;

use vellum_core::{AllowlistError, AllowlistSource};

/// Extract identifiers from tabular allowlist text
///
/// Takes the first comma-separated cell of each row, trimmed of whitespace
/// and surrounding quotes. Blank rows and `#` comment rows are skipped. A
/// header cell is kept; it can never match a real principal. A leading
/// byte order mark, as written by spreadsheet exports, is dropped.
pub fn parse_allowlist(text: &str) -> Vec<String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let cell = line.split(',').next().unwrap_or(line);
            let cell = cell.trim().trim_matches('"').trim();
            (!cell.is_empty()).then(|| cell.to_string())
        })
        .collect()
}

/// In-process allowlist that can be swapped or taken offline
///
/// Used by tests and demos to simulate an upstream list that changes or
/// becomes unreachable.
#[derive(Debug, Default)]
pub struct StaticAllowlistSource {
    entries: RwLock<Vec<String>>,
    offline: AtomicBool,
}

impl StaticAllowlistSource {
    /// Create a source serving `entries`
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: RwLock::new(entries.into_iter().map(Into::into).collect()),
            offline: AtomicBool::new(false),
        }
    }

    /// Replace the whole list
    pub fn set_entries<I, S>(&self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        *guard = entries.into_iter().map(Into::into).collect();
    }

    /// Make every fetch fail (or succeed again)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AllowlistSource for StaticAllowlistSource {
    async fn fetch(&self) -> Result<Vec<String>, AllowlistError> {
        if self.is_offline() {
            return Err(AllowlistError::unreachable("static source is offline"));
        }
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }
}

/// Allowlist kept in a local CSV-like file
#[derive(Debug, Clone)]
pub struct FileAllowlistSource {
    path: PathBuf,
}

impl FileAllowlistSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AllowlistSource for FileAllowlistSource {
    async fn fetch(&self) -> Result<Vec<String>, AllowlistError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let text = String::from_utf8(bytes).map_err(|e| {
            AllowlistError::Malformed(format!("{}: {e}", self.path.display()))
        })?;
        let entries = parse_allowlist(&text);
        debug!(path = %self.path.display(), count = entries.len(), "Read allowlist file");
        Ok(entries)
    }
}
