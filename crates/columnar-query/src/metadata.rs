//! Query metadata decoding
//!
//! The trailing metadata envelope is a JSON object. Unknown fields are
//! ignored, missing counters default to zero and a missing warning list is
//! empty. Durations arrive as Go duration text (`"12.5ms"`).

use crate::error::{Error, Result};
use columnar_config::parse_go_duration;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Immutable snapshot of a query's trailing metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMetadata {
    /// Server-assigned request id
    pub request_id: String,
    /// Execution metrics
    pub metrics: QueryMetrics,
    /// Warnings in server order; empty when none were reported
    pub warnings: Vec<QueryWarning>,
}

/// Server-side execution metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMetrics {
    /// Wall time from receipt to last byte
    pub elapsed_time: Duration,
    /// Time spent executing the statement
    pub execution_time: Duration,
    /// Rows returned
    pub result_count: u64,
    /// Bytes returned
    pub result_size: u64,
    /// Objects scanned
    pub processed_objects: u64,
}

/// A non-fatal warning reported by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryWarning {
    /// Warning code
    pub code: u32,
    /// Warning text
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonAnalyticsResponse {
    #[serde(rename = "requestID")]
    request_id: String,
    metrics: JsonAnalyticsMetrics,
    warnings: Vec<JsonAnalyticsWarning>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct JsonAnalyticsMetrics {
    elapsed_time: String,
    execution_time: String,
    result_count: u64,
    result_size: u64,
    processed_objects: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonAnalyticsWarning {
    code: u32,
    msg: String,
}

impl QueryMetadata {
    /// Decode a metadata envelope
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let resp: JsonAnalyticsResponse =
            serde_json::from_slice(bytes).map_err(Error::MetadataParse)?;
        Ok(resp.into())
    }
}

impl From<JsonAnalyticsResponse> for QueryMetadata {
    fn from(resp: JsonAnalyticsResponse) -> Self {
        Self {
            request_id: resp.request_id,
            metrics: QueryMetrics {
                elapsed_time: metric_duration("elapsedTime", &resp.metrics.elapsed_time),
                execution_time: metric_duration("executionTime", &resp.metrics.execution_time),
                result_count: resp.metrics.result_count,
                result_size: resp.metrics.result_size,
                processed_objects: resp.metrics.processed_objects,
            },
            warnings: resp
                .warnings
                .into_iter()
                .map(|w| QueryWarning {
                    code: w.code,
                    message: w.msg,
                })
                .collect(),
        }
    }
}

fn metric_duration(field: &str, raw: &str) -> Duration {
    if raw.is_empty() {
        return Duration::ZERO;
    }
    parse_go_duration(raw).unwrap_or_else(|e| {
        debug!(field, error = %e, "Failed to parse metrics duration");
        Duration::ZERO
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_envelope() {
        let meta = QueryMetadata::from_json(
            br#"{
                "requestID": "94c7f89f-92a6-4d3d-a5b6-b5e2e8ba5c84",
                "clientContextID": "ignored",
                "signature": {"*": "*"},
                "status": "success",
                "metrics": {
                    "elapsedTime": "14.927542ms",
                    "executionTime": "12.875792ms",
                    "resultCount": 2,
                    "resultSize": 360,
                    "processedObjects": 187
                },
                "warnings": [{"code": 24055, "msg": "unused variable"}]
            }"#,
        )
        .unwrap();

        assert_eq!(meta.request_id, "94c7f89f-92a6-4d3d-a5b6-b5e2e8ba5c84");
        assert_eq!(meta.metrics.elapsed_time, Duration::from_nanos(14_927_542));
        assert_eq!(meta.metrics.execution_time, Duration::from_nanos(12_875_792));
        assert_eq!(meta.metrics.result_count, 2);
        assert_eq!(meta.metrics.result_size, 360);
        assert_eq!(meta.metrics.processed_objects, 187);
        assert_eq!(
            meta.warnings,
            vec![QueryWarning {
                code: 24055,
                message: "unused variable".into()
            }]
        );
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let meta = QueryMetadata::from_json(br#"{"requestID": "abc"}"#).unwrap();
        assert_eq!(meta.request_id, "abc");
        assert_eq!(meta.metrics, QueryMetrics::default());
        assert!(meta.warnings.is_empty());
    }

    #[test]
    fn test_unparseable_duration_defaults_to_zero() {
        let meta =
            QueryMetadata::from_json(br#"{"metrics": {"elapsedTime": "fast", "resultCount": 1}}"#)
                .unwrap();
        assert_eq!(meta.metrics.elapsed_time, Duration::ZERO);
        assert_eq!(meta.metrics.result_count, 1);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = QueryMetadata::from_json(b"{\"requestID\": ").unwrap_err();
        assert!(matches!(err, Error::MetadataParse(_)));
        assert!(err.to_string().starts_with("failed to unmarshal metadata"));
    }

    #[test]
    fn test_wrong_shape_is_parse_error() {
        let err = QueryMetadata::from_json(br#"{"metrics": {"resultCount": "two"}}"#).unwrap_err();
        assert!(matches!(err, Error::MetadataParse(_)));
    }
}
