//! Authorization gate
//!
//! Decides whether a principal may use the gateway, using only the current
//! allowlist snapshot. Fails closed: no usable snapshot means nobody gets in.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use vellum_core::Principal;

use crate::allowlist::{AllowlistCache, SnapshotStamp};
use crate::error::{GatewayError, GatewayResult};

/// Why access was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Not on the allowlist
    NotListed,
    /// Nothing left after normalization
    EmptyPrincipal,
    /// The allowlist was never fetched successfully
    AllowlistUnavailable,
    /// The last good allowlist is older than the staleness threshold
    AllowlistStale,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotListed => "principal is not on the allowlist",
            Self::EmptyPrincipal => "principal is empty",
            Self::AllowlistUnavailable => "allowlist has not been loaded",
            Self::AllowlistStale => "allowlist is stale",
        };
        f.write_str(text)
    }
}

/// Allow or deny
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Allow,
    Deny(DenyReason),
}

/// The outcome of one authorization check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    /// Normalized principal the decision is about
    pub principal: Principal,
    pub verdict: Verdict,
    /// Snapshot the decision was made against
    pub snapshot: SnapshotStamp,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        self.verdict == Verdict::Allow
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self.verdict {
            Verdict::Allow => None,
            Verdict::Deny(reason) => Some(reason),
        }
    }

    /// Turn a denial into [`GatewayError::Authorization`]
    pub fn ensure_allowed(&self) -> GatewayResult<()> {
        match self.verdict {
            Verdict::Allow => Ok(()),
            Verdict::Deny(reason) => Err(GatewayError::Authorization { reason }),
        }
    }
}

/// Checks principals against the allowlist cache
#[derive(Clone)]
pub struct AuthorizationGate {
    cache: Arc<AllowlistCache>,
}

impl AuthorizationGate {
    pub fn new(cache: Arc<AllowlistCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<AllowlistCache> {
        &self.cache
    }

    /// Decide for a raw principal string as handed over by the identity provider
    pub fn authorize(&self, raw_principal: &str) -> AccessDecision {
        let principal = Principal::normalize(raw_principal);
        let snapshot = self.cache.current_snapshot();

        let verdict = if principal.is_empty() {
            Verdict::Deny(DenyReason::EmptyPrincipal)
        } else if !snapshot.is_usable() {
            if snapshot.is_cold() {
                Verdict::Deny(DenyReason::AllowlistUnavailable)
            } else {
                Verdict::Deny(DenyReason::AllowlistStale)
            }
        } else if snapshot.contains(&principal) {
            Verdict::Allow
        } else {
            Verdict::Deny(DenyReason::NotListed)
        };

        match verdict {
            Verdict::Allow => debug!(
                principal = %principal,
                generation = snapshot.generation(),
                "Access allowed"
            ),
            Verdict::Deny(reason) => info!(
                principal = %principal,
                generation = snapshot.generation(),
                reason = %reason,
                "Access denied"
            ),
        }

        AccessDecision {
            principal,
            verdict,
            snapshot: snapshot.stamp(),
        }
    }
}
