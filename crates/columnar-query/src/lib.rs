//! Query client for the columnar analytics service
//!
//! This crate turns typed query requests into wire payloads, hands them to a
//! transport agent, and exposes the response as a lazily-consumed row stream
//! with trailing metadata. Every transport failure is translated into one
//! stable error taxonomy (see [`classify`]).
//!
//! Network I/O, pooling and retries belong to the agent, consumed through
//! [`ColumnarAgent`] / [`AgentRowStream`].
//!
//! ```rust,no_run
//! # use columnar_query::ColumnarAgent;
//! # use std::sync::Arc;
//! # async fn run(agent: Arc<dyn ColumnarAgent>) -> columnar_query::Result<()> {
//! use columnar_query::{Cluster, ClusterOptions, QueryOptions, RequestContext};
//! use std::time::Duration;
//!
//! let cluster = Cluster::new(agent, ClusterOptions::new())?;
//! let scope = cluster.database("travel-sample").scope("inventory");
//! let ctx = RequestContext::new().with_timeout(Duration::from_secs(30));
//!
//! let options = QueryOptions::new().named_parameter("country", "France");
//! let mut result = scope
//!     .query(&ctx, "SELECT name FROM airline WHERE country = $country", options)
//!     .await?;
//! while let Some(row) = result.next_row().await {
//!     let value: serde_json::Value = row.content_as()?;
//!     println!("{value}");
//! }
//! if let Some(err) = result.err() {
//!     eprintln!("stream failed: {err}");
//! }
//! result.close().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod agent;
pub mod classify;
mod client;
mod cluster;
pub mod context;
pub mod deadline;
mod error;
mod metadata;
mod options;
pub mod payload;
mod reader;
mod result;
mod unmarshal;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use agent::{
    AgentError, AgentErrorDesc, AgentQueryOptions, AgentRowStream, ColumnarAgent,
    ColumnarAgentError, InnerError,
};
pub use client::QueryClient;
pub use cluster::{Cluster, Database, Scope};
pub use context::{ContextError, RequestContext};
pub use error::{ColumnarError, ColumnarErrorDesc, Error, ErrorCause, QueryError, Result};
pub use metadata::{QueryMetadata, QueryMetrics, QueryWarning};
pub use options::{QueryOptions, ScanConsistency};
pub use payload::Payload;
pub use reader::{RowReader, StreamState};
pub use result::{BufferedQueryResult, QueryResult, QueryResultRow};
pub use unmarshal::{JsonUnmarshaler, Unmarshaler};

pub use columnar_config::{ClusterOptions, Namespace, ResolvedTimeouts, TimeoutOptions};
