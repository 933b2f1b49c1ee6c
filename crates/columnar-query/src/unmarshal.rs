//! Row decoding

use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;

/// Decodes one raw result row.
///
/// Object safe so a client-wide default and per-request overrides can be
/// stored as `Arc<dyn Unmarshaler>`; typed access goes through
/// [`crate::QueryResultRow::content_as`].
pub trait Unmarshaler: fmt::Debug + Send + Sync {
    /// Decode `data` into a JSON value; failures map to [`Error::Unmarshal`]
    fn unmarshal(&self, data: &[u8]) -> Result<Value>;
}

/// Decodes rows as JSON; the client default
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonUnmarshaler;

impl JsonUnmarshaler {
    /// Create the JSON unmarshaler
    pub fn new() -> Self {
        Self
    }
}

impl Unmarshaler for JsonUnmarshaler {
    fn unmarshal(&self, data: &[u8]) -> Result<Value> {
        serde_json::from_slice(data).map_err(|e| Error::Unmarshal(e.to_string()))
    }
}
