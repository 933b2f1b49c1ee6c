//! Wire payload construction
//!
//! The payload is a flat field-name -> value map. It is built by applying
//! field-setting rules in a fixed order to one mutable map, so a later rule
//! overwrites whatever an earlier rule put under the same key:
//!
//! 1. `args` from positional parameters
//! 2. `$name` for each named parameter
//! 3. `scan_consistency`
//! 4. `readonly`
//! 5. `timeout`
//! 6. `statement`
//! 7. raw passthrough entries, verbatim
//!
//! Raw entries therefore shadow every derived field, `statement` included.
//! The client adds `query_context` and `client_context_id` after this, so
//! those two can never be overridden.

use crate::error::{Error, Result};
use crate::options::{QueryOptions, ScanConsistency};
use serde_json::Value;

/// Wire payload: field name -> value
pub type Payload = serde_json::Map<String, Value>;

/// Wire field names
pub mod fields {
    /// Statement text
    pub const STATEMENT: &str = "statement";
    /// Positional parameters
    pub const ARGS: &str = "args";
    /// Scan consistency level
    pub const SCAN_CONSISTENCY: &str = "scan_consistency";
    /// Read-only flag
    pub const READONLY: &str = "readonly";
    /// Server-side timeout as Go duration text
    pub const TIMEOUT: &str = "timeout";
    /// Namespace the statement resolves against
    pub const QUERY_CONTEXT: &str = "query_context";
    /// Client-generated request id
    pub const CLIENT_CONTEXT_ID: &str = "client_context_id";
}

/// Priority value the agent understands as "prioritized"
pub const PRIORITY_SENTINEL: i32 = -1;

/// Prefix marking a named parameter on the wire
const NAMED_PARAM_PREFIX: char = '$';

/// Build the wire payload for `statement`.
///
/// `timeout` is the already-resolved duration string. Fails with
/// `InvalidArgument` (field `ScanConsistency`) for an unrecognized scan
/// consistency; nothing is sent in that case.
pub fn build_payload(statement: &str, options: &QueryOptions, timeout: &str) -> Result<Payload> {
    let mut payload = Payload::new();

    if let Some(args) = &options.positional_parameters {
        payload.insert(fields::ARGS.to_string(), Value::Array(args.clone()));
    }

    if let Some(named) = &options.named_parameters {
        for (key, value) in named {
            payload.insert(named_parameter_key(key), value.clone());
        }
    }

    if let Some(consistency) = options.scan_consistency {
        let wire = match consistency {
            ScanConsistency::NotBounded => "not_bounded",
            ScanConsistency::RequestPlus => "request_plus",
            ScanConsistency::Unrecognized(_) => {
                return Err(Error::invalid_argument("ScanConsistency", "unknown value"));
            }
        };
        payload.insert(fields::SCAN_CONSISTENCY.to_string(), Value::from(wire));
    }

    if let Some(read_only) = options.read_only {
        payload.insert(fields::READONLY.to_string(), Value::Bool(read_only));
    }

    payload.insert(fields::TIMEOUT.to_string(), Value::from(timeout));
    payload.insert(fields::STATEMENT.to_string(), Value::from(statement));

    if let Some(raw) = &options.raw {
        for (key, value) in raw {
            payload.insert(key.clone(), value.clone());
        }
    }

    Ok(payload)
}

/// Priority hint for the agent: the sentinel when prioritized, else none
pub fn priority_hint(options: &QueryOptions) -> Option<i32> {
    (options.priority == Some(true)).then_some(PRIORITY_SENTINEL)
}

fn named_parameter_key(key: &str) -> String {
    if key.starts_with(NAMED_PARAM_PREFIX) {
        key.to_string()
    } else {
        format!("{NAMED_PARAM_PREFIX}{key}")
    }
}
