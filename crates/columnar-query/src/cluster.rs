//! Cluster, database and scope handles
//!
//! [`Cluster`] is the entry point callers hold on to. It validates the
//! timeout configuration once, then hands out [`Database`] and [`Scope`]
//! handles that share its agent. Queries issued through a [`Scope`] carry
//! the scope's `query_context`.

use crate::agent::ColumnarAgent;
use crate::classify::classify;
use crate::client::QueryClient;
use crate::context::RequestContext;
use crate::error::Result;
use crate::options::QueryOptions;
use crate::result::QueryResult;
use crate::unmarshal::Unmarshaler;
use columnar_config::{ClusterOptions, Namespace, ResolvedTimeouts};
use std::sync::Arc;
use tracing::debug;

/// Handle to an analytics cluster
#[derive(Debug, Clone)]
pub struct Cluster {
    client: QueryClient,
    timeouts: ResolvedTimeouts,
}

impl Cluster {
    /// Build a cluster over `agent`. Fails with `InvalidArgument` when a
    /// configured timeout is zero.
    pub fn new(agent: Arc<dyn ColumnarAgent>, options: ClusterOptions) -> Result<Self> {
        let timeouts = options.resolve()?;
        debug!(
            connect_timeout = ?timeouts.connect_timeout,
            query_timeout = ?timeouts.query_timeout,
            "Cluster handle created"
        );
        Ok(Self {
            client: QueryClient::new(agent, timeouts.query_timeout)?,
            timeouts,
        })
    }

    /// Replace the default row unmarshaler for every handle derived from
    /// this cluster
    pub fn with_unmarshaler(mut self, unmarshaler: Arc<dyn Unmarshaler>) -> Self {
        self.client = self.client.with_unmarshaler(unmarshaler);
        self
    }

    /// Resolved timeout configuration
    pub fn timeouts(&self) -> &ResolvedTimeouts {
        &self.timeouts
    }

    /// Run a query without a namespace
    pub async fn query(
        &self,
        ctx: &RequestContext,
        statement: &str,
        options: QueryOptions,
    ) -> Result<QueryResult> {
        self.client.query(ctx, statement, options).await
    }

    /// Handle to database `name`; no request is made
    pub fn database(&self, name: impl Into<String>) -> Database {
        Database {
            client: self.client.clone(),
            name: name.into(),
        }
    }

    /// Shut down the agent
    pub async fn close(&self) -> Result<()> {
        debug!("Closing cluster");
        self.client.agent().close().await.map_err(classify)
    }
}

/// A database within a cluster
#[derive(Debug, Clone)]
pub struct Database {
    client: QueryClient,
    name: String,
}

impl Database {
    /// Database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle to scope `name` within this database
    pub fn scope(&self, name: impl Into<String>) -> Scope {
        let namespace = Namespace::new(self.name.clone(), name);
        Scope {
            client: self.client.clone().with_namespace(namespace),
        }
    }
}

/// A scope within a database; its queries run in the scope's context
#[derive(Debug, Clone)]
pub struct Scope {
    client: QueryClient,
}

impl Scope {
    /// Database and scope this handle targets
    pub fn namespace(&self) -> Option<&Namespace> {
        self.client.namespace()
    }

    /// Scope name
    pub fn name(&self) -> &str {
        self.namespace().map(|ns| ns.scope.as_str()).unwrap_or_default()
    }

    /// Run a query with `query_context` set to this scope
    pub async fn query(
        &self,
        ctx: &RequestContext,
        statement: &str,
        options: QueryOptions,
    ) -> Result<QueryResult> {
        self.client.query(ctx, statement, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{
        AgentError, AgentQueryOptions, AgentRowStream, ColumnarAgentError, InnerError,
    };
    use crate::mock::MockAgent;
    use crate::payload::fields;
    use columnar_config::TimeoutOptions;
    use serde_json::json;
    use std::time::Duration;

    fn cluster(agent: &Arc<MockAgent>, options: ClusterOptions) -> Cluster {
        Cluster::new(agent.clone(), options).unwrap()
    }

    #[test]
    fn test_defaults_resolved() {
        let c = cluster(&Arc::new(MockAgent::new()), ClusterOptions::new());
        assert_eq!(c.timeouts().connect_timeout, Duration::from_secs(10));
        assert_eq!(c.timeouts().query_timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_zero_query_timeout_rejected() {
        let options = ClusterOptions::new()
            .with_timeouts(TimeoutOptions::new().with_query_timeout(Duration::ZERO));
        let err = Cluster::new(Arc::new(MockAgent::new()), options).unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("QueryTimeout"));
    }

    #[tokio::test]
    async fn test_cluster_query_uses_configured_timeout() {
        let agent = Arc::new(MockAgent::new());
        let options = ClusterOptions::new()
            .with_timeouts(TimeoutOptions::new().with_query_timeout(Duration::from_secs(90)));
        cluster(&agent, options)
            .query(&RequestContext::new(), "SELECT 1", QueryOptions::new())
            .await
            .unwrap();

        let request = agent.last_request().unwrap();
        assert_eq!(request.payload[fields::TIMEOUT], json!("1m30s"));
        assert!(!request.payload.contains_key(fields::QUERY_CONTEXT));
    }

    #[tokio::test]
    async fn test_scope_query_carries_namespace() {
        let agent = Arc::new(MockAgent::new());
        let scope = cluster(&agent, ClusterOptions::new())
            .database("travel-sample")
            .scope("inventory");
        assert_eq!(scope.name(), "inventory");

        scope
            .query(&RequestContext::new(), "SELECT * FROM airline", QueryOptions::new())
            .await
            .unwrap();
        assert_eq!(
            agent.last_request().unwrap().payload[fields::QUERY_CONTEXT],
            json!("default:`travel-sample`.`inventory`")
        );
    }

    #[tokio::test]
    async fn test_close_reaches_agent() {
        let agent = Arc::new(MockAgent::new());
        cluster(&agent, ClusterOptions::new()).close().await.unwrap();
        assert!(agent.is_closed());
    }

    #[tokio::test]
    async fn test_close_error_is_classified() {
        #[derive(Debug)]
        struct FailingAgent;

        #[async_trait::async_trait]
        impl ColumnarAgent for FailingAgent {
            async fn query(
                &self,
                _ctx: &RequestContext,
                _options: AgentQueryOptions,
            ) -> std::result::Result<Box<dyn AgentRowStream>, AgentError> {
                Err(ColumnarAgentError::new(InnerError::Other("unused".into())).into())
            }

            async fn close(&self) -> std::result::Result<(), AgentError> {
                Err(ColumnarAgentError::new(InnerError::Timeout).into())
            }
        }

        let c = Cluster::new(Arc::new(FailingAgent), ClusterOptions::new()).unwrap();
        assert!(c.close().await.unwrap_err().is_timeout());
    }
}
