//! Request correlation for gateway operations
//!
//! Every `search` or `save_edit` call gets a [`RequestCorrelation`] whose
//! request id is recorded on the operation span, so all events emitted while
//! serving one request (including store retries and the audit record) can be
//! grouped after the fact.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

const REQUEST_ID_FIELD: &str = "request_id";
const OPERATION_FIELD: &str = "operation";

/// The gateway operations a request can be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Search,
    SaveEdit,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::SaveEdit => "save_edit",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation data for one gateway request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestCorrelation {
    pub request_id: Uuid,
    pub operation: Operation,
    /// When the request entered the gateway, per the gateway's clock
    pub started_at: DateTime<Utc>,
}

impl RequestCorrelation {
    pub fn new(operation: Operation, started_at: DateTime<Utc>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            operation,
            started_at,
        }
    }

    /// Milliseconds since the request started, as of `now`
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        (now - self.started_at).num_milliseconds().max(0) as u64
    }
}

/// Attach correlation data to a tracing span
///
/// The span must declare `request_id` and `operation` fields (usually as
/// `tracing::field::Empty`) for the values to be kept.
pub trait CorrelationExt {
    fn record_correlation(&self, ctx: &RequestCorrelation);
}

impl CorrelationExt for tracing::Span {
    fn record_correlation(&self, ctx: &RequestCorrelation) {
        self.record(REQUEST_ID_FIELD, ctx.request_id.to_string());
        self.record(OPERATION_FIELD, ctx.operation.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_correlation_ids_differ() {
        let now = Utc::now();
        let a = RequestCorrelation::new(Operation::Search, now);
        let b = RequestCorrelation::new(Operation::Search, now);
        assert_eq!(a.operation.to_string(), "search");
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn test_elapsed_never_negative() {
        let ctx = RequestCorrelation::new(Operation::SaveEdit, Utc::now());
        let earlier = ctx.started_at - chrono::Duration::seconds(5);
        assert_eq!(ctx.elapsed_ms(earlier), 0);
        let later = ctx.started_at + chrono::Duration::milliseconds(250);
        assert_eq!(ctx.elapsed_ms(later), 250);
    }

    #[test]
    fn test_record_on_span_without_subscriber() {
        let span = tracing::info_span!(
            "save_edit",
            request_id = tracing::field::Empty,
            operation = tracing::field::Empty
        );
        span.record_correlation(&RequestCorrelation::new(Operation::SaveEdit, Utc::now()));
    }
}
