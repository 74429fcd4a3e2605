//! Principal identifiers
//!
//! A principal is whatever the identity provider vouches for, usually an
//! email address. The gateway trusts the value as-is but always compares the
//! normalized form, and allowlist entries are normalized the same way on
//! ingest.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalized principal identifier (trimmed, lower-cased)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    /// Normalize a raw identifier
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    /// Get the normalized identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if nothing remains after normalization
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}
