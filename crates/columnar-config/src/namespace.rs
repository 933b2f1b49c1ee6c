//! Database/scope namespace

use serde::{Deserialize, Serialize};

/// A database/scope pairing that scopes a query's default context
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    /// Database name
    pub database: String,
    /// Scope name within the database
    pub scope: String,
}

impl Namespace {
    /// Create a namespace for `database`.`scope`
    pub fn new(database: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            scope: scope.into(),
        }
    }

    /// Render the `query_context` wire value, e.g. ``default:`db`.`scope` ``
    pub fn query_context(&self) -> String {
        format!("default:`{}`.`{}`", self.database, self.scope)
    }
}
