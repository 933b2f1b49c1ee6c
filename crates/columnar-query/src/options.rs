//! Per-request query options

use crate::unmarshal::Unmarshaler;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Consistency requirement for the data a query reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanConsistency {
    /// Read whatever is indexed now
    NotBounded,
    /// Wait for all mutations up to request time
    RequestPlus,
    /// A numeric value from an untyped source that matches no known level;
    /// rejected when the payload is built
    Unrecognized(u8),
}

impl From<u8> for ScanConsistency {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::NotBounded,
            2 => Self::RequestPlus,
            other => Self::Unrecognized(other),
        }
    }
}

/// Options for a single query.
///
/// Named-parameter keys and raw keys are resolved independently; raw entries
/// are applied after every derived field and can silently shadow any of them.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Positional parameters, sent under `args` in order
    pub positional_parameters: Option<Vec<Value>>,
    /// Named parameters; keys gain a `$` prefix when missing
    pub named_parameters: Option<HashMap<String, Value>>,
    /// Wire fields copied verbatim into the payload
    pub raw: Option<HashMap<String, Value>>,
    /// Index consistency to wait for
    pub scan_consistency: Option<ScanConsistency>,
    /// Sent whenever set, including `false`
    pub read_only: Option<bool>,
    /// `Some(true)` marks the request as prioritized
    pub priority: Option<bool>,
    /// Overrides the client's default row unmarshaler
    pub unmarshaler: Option<Arc<dyn Unmarshaler>>,
}

impl QueryOptions {
    /// Empty options; only `statement` and `timeout` are sent
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the positional parameters
    pub fn positional_parameters(mut self, params: Vec<Value>) -> Self {
        self.positional_parameters = Some(params);
        self
    }

    /// Add one named parameter
    pub fn named_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named_parameters
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Replace every named parameter
    pub fn named_parameters(mut self, params: HashMap<String, Value>) -> Self {
        self.named_parameters = Some(params);
        self
    }

    /// Add a raw wire field
    pub fn raw(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.raw
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set the scan consistency
    pub fn scan_consistency(mut self, consistency: ScanConsistency) -> Self {
        self.scan_consistency = Some(consistency);
        self
    }

    /// Set the read-only flag
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    /// Set the priority flag
    pub fn priority(mut self, priority: bool) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Decode rows of this request with `unmarshaler`
    pub fn unmarshaler(mut self, unmarshaler: Arc<dyn Unmarshaler>) -> Self {
        self.unmarshaler = Some(unmarshaler);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scan_consistency_from_raw_value() {
        assert_eq!(ScanConsistency::from(1u8), ScanConsistency::NotBounded);
        assert_eq!(ScanConsistency::from(2u8), ScanConsistency::RequestPlus);
        assert_eq!(ScanConsistency::from(9u8), ScanConsistency::Unrecognized(9));
    }

    #[test]
    fn test_builder_accumulates_named_and_raw() {
        let opts = QueryOptions::new()
            .named_parameter("country", "France")
            .named_parameter("$limit", 10)
            .raw("pretty", true);

        let named = opts.named_parameters.unwrap();
        assert_eq!(named.len(), 2);
        assert_eq!(named["country"], json!("France"));
        assert_eq!(opts.raw.unwrap()["pretty"], json!(true));
        assert!(opts.scan_consistency.is_none());
    }
}
